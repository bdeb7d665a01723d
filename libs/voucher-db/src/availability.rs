//! Read-time availability of a voucher.
//!
//! The validity window is the only authority on whether a voucher can be
//! claimed or redeemed. Nothing here is persisted; callers may evaluate stale
//! rows freely since the result is recomputed under the row lock before any
//! capacity is consumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    NotYetValid,
    Available,
    Expired,
}

impl Availability {
    /// `valid_from` is inclusive, `expires_at` exclusive.
    pub fn evaluate(
        valid_from: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        if now >= expires_at {
            Availability::Expired
        } else if now < valid_from {
            Availability::NotYetValid
        } else {
            Availability::Available
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Display label derived from the window and the redemption counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    Upcoming,
    Active,
    SoldOut,
    Expired,
}

impl VoucherStatus {
    pub fn derive(availability: Availability, sold_out: bool) -> Self {
        match availability {
            Availability::Expired => VoucherStatus::Expired,
            Availability::NotYetValid => VoucherStatus::Upcoming,
            Availability::Available if sold_out => VoucherStatus::SoldOut,
            Availability::Available => VoucherStatus::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Upcoming => "UPCOMING",
            VoucherStatus::Active => "ACTIVE",
            VoucherStatus::SoldOut => "SOLD_OUT",
            VoucherStatus::Expired => "EXPIRED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_boundaries() {
        let now = Utc::now();
        let from = now - Duration::hours(1);
        let until = now + Duration::hours(1);

        assert_eq!(Availability::evaluate(from, until, now), Availability::Available);
        assert_eq!(Availability::evaluate(from, until, from), Availability::Available);
        assert_eq!(Availability::evaluate(from, until, until), Availability::Expired);
        assert_eq!(
            Availability::evaluate(from, until, from - Duration::seconds(1)),
            Availability::NotYetValid
        );
    }

    #[test]
    fn expired_wins_over_sold_out() {
        assert_eq!(
            VoucherStatus::derive(Availability::Expired, true),
            VoucherStatus::Expired
        );
        assert_eq!(
            VoucherStatus::derive(Availability::Available, true),
            VoucherStatus::SoldOut
        );
        assert_eq!(
            VoucherStatus::derive(Availability::NotYetValid, false),
            VoucherStatus::Upcoming
        );
        assert_eq!(
            VoucherStatus::derive(Availability::Available, false),
            VoucherStatus::Active
        );
    }
}
