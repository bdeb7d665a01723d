use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::voucher::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "voucher_scan_source", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanSource {
    QrScan,
    Link,
    Search,
    Map,
    Notification,
    Direct,
}

impl std::str::FromStr for ScanSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QR_SCAN" => Ok(ScanSource::QrScan),
            "LINK" => Ok(ScanSource::Link),
            "SEARCH" => Ok(ScanSource::Search),
            "MAP" => Ok(ScanSource::Map),
            "NOTIFICATION" => Ok(ScanSource::Notification),
            "DIRECT" => Ok(ScanSource::Direct),
            other => Err(format!("unknown scan source '{}'", other)),
        }
    }
}

/// Analytics only. Never read back for redemption or claim decisions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoucherScan {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub scan_source: ScanSource,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_info: Json<serde_json::Value>,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScan {
    pub voucher_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub scan_source: ScanSource,
    pub location: Option<GeoPoint>,
    pub device_info: serde_json::Value,
    pub scanned_at: DateTime<Utc>,
}
