//! Redemption preconditions, evaluated by every store backend while it holds
//! the voucher row lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::Availability;
use crate::models::{Voucher, VoucherCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionRejection {
    #[error("code is unknown, inactive or belongs to another voucher")]
    InvalidCode,
    #[error("voucher is not valid yet")]
    NotYetValid,
    #[error("voucher has expired")]
    Expired,
    #[error("customer reached the per-customer redemption limit")]
    PerUserLimitExceeded,
    #[error("voucher is sold out")]
    SoldOut,
}

/// Checks, in order: code, validity window, per-customer cap, global cap.
pub fn check_redemption(
    voucher: &Voucher,
    code: Option<&VoucherCode>,
    voucher_id: Uuid,
    customer_redemptions: i64,
    now: DateTime<Utc>,
) -> Result<(), RedemptionRejection> {
    match code {
        Some(code) if code.is_active && code.belongs_to(voucher_id) => {}
        _ => return Err(RedemptionRejection::InvalidCode),
    }

    match voucher.availability(now) {
        Availability::Available => {}
        Availability::NotYetValid => return Err(RedemptionRejection::NotYetValid),
        Availability::Expired => return Err(RedemptionRejection::Expired),
    }

    if customer_redemptions >= i64::from(voucher.max_redemptions_per_user) {
        return Err(RedemptionRejection::PerUserLimitExceeded);
    }

    if voucher.is_sold_out() {
        return Err(RedemptionRejection::SoldOut);
    }

    Ok(())
}
