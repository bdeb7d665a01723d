use serde::{Deserialize, Serialize};

pub mod api {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Location {
        pub latitude: f64,
        pub longitude: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VoucherView {
        pub id: Uuid,
        pub provider_id: Uuid,
        pub category_id: Option<Uuid>,
        pub title: BTreeMap<String, String>,
        pub description: BTreeMap<String, String>,
        pub terms: BTreeMap<String, String>,
        pub discount_type: String,
        pub discount_value: f64,
        pub currency: Option<String>,
        pub location: Option<Location>,
        pub valid_from: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        /// Derived at read time, never stored.
        pub status: String,
        pub available: bool,
        pub max_redemptions: Option<i32>,
        pub max_redemptions_per_user: i32,
        pub current_redemptions: i32,
        pub remaining_redemptions: Option<i32>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct TrackScanRequest {
        #[serde(default)]
        pub customer_id: Option<Uuid>,
        #[serde(default = "default_scan_source")]
        pub scan_source: String,
        #[serde(default)]
        pub location: Option<Location>,
        #[serde(default)]
        pub device_info: serde_json::Value,
    }

    fn default_scan_source() -> String {
        "DIRECT".to_string()
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct NearbyLocation {
        pub name: String,
        pub address: Option<String>,
        pub location: Location,
        pub distance_meters: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ScanResponse {
        pub voucher: VoucherView,
        /// `None` when the analytics write failed.
        pub scan_id: Option<Uuid>,
        pub can_claim: bool,
        pub already_claimed: bool,
        pub nearby_locations: Option<Vec<NearbyLocation>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ClaimRequest {
        pub customer_id: Uuid,
        #[serde(default)]
        pub notify_before_expiry: Option<bool>,
        #[serde(default)]
        pub notify_nearby: Option<bool>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ClaimResponse {
        pub claim_id: Uuid,
        pub voucher_id: Uuid,
        pub customer_id: Uuid,
        pub claimed_at: DateTime<Utc>,
        pub wallet_position: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RedeemRequest {
        pub customer_id: Uuid,
        pub code: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RedemptionResponse {
        pub redemption_id: Uuid,
        pub voucher_id: Uuid,
        pub customer_id: Uuid,
        pub redeemed_at: DateTime<Utc>,
        pub remaining_redemptions: Option<i32>,
        pub customer_remaining: i64,
        pub sold_out: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WalletEntry {
        pub claim_id: Uuid,
        pub wallet_position: i32,
        pub claimed_at: DateTime<Utc>,
        pub voucher: VoucherView,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VoucherStats {
        pub voucher_id: Uuid,
        pub status: String,
        pub current_redemptions: i32,
        pub redemption_rows: i64,
        pub remaining_redemptions: Option<i32>,
        pub scans: i64,
        pub active_codes: usize,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CodeView {
        pub id: Uuid,
        pub code: String,
        pub code_type: String,
        pub is_active: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CreatedVoucher {
        pub voucher: VoucherView,
        pub codes: Vec<CodeView>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ErrorBody {
        /// Stable machine readable kind, e.g. `SOLD_OUT`.
        pub error: String,
        pub message: String,
        pub retryable: bool,
    }
}
