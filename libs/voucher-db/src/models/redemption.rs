use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only record of one consumed unit of voucher capacity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoucherRedemption {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub customer_id: Uuid,
    pub code_id: Uuid,
    pub redeemed_at: DateTime<Utc>,
}

/// Input of the redemption transaction. `code` is already normalized.
#[derive(Debug, Clone)]
pub struct RedemptionAttempt {
    pub voucher_id: Uuid,
    pub customer_id: Uuid,
    pub code: String,
    pub now: DateTime<Utc>,
}

/// Result of a committed redemption, with the counter as seen under the lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub redemption: VoucherRedemption,
    pub current_redemptions: i32,
    pub max_redemptions: Option<i32>,
    pub customer_redemptions: i64,
    pub max_redemptions_per_user: i32,
}

impl RedemptionReceipt {
    pub fn exhausted(&self) -> bool {
        matches!(self.max_redemptions, Some(max) if self.current_redemptions >= max)
    }

    pub fn remaining(&self) -> Option<i32> {
        self.max_redemptions
            .map(|max| (max - self.current_redemptions).max(0))
    }
}
