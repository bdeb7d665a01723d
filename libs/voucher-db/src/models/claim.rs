use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoucherClaim {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub customer_id: Uuid,
    pub claimed_at: DateTime<Utc>,
    /// 1-based rank among the customer's claims.
    pub wallet_position: i32,
    pub notify_before_expiry: bool,
    pub notify_nearby: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub notify_before_expiry: bool,
    #[serde(default)]
    pub notify_nearby: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            notify_before_expiry: true,
            notify_nearby: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewClaim {
    pub voucher_id: Uuid,
    pub customer_id: Uuid,
    pub claimed_at: DateTime<Utc>,
    pub preferences: NotificationPreferences,
}
