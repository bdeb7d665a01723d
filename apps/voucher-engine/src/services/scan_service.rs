use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use voucher_db::VoucherStore;
use voucher_db::models::{GeoPoint, NewScan, ScanSource, Voucher};
use voucher_shared::api::NearbyLocation;

use crate::clock::Clock;
use crate::error::VoucherError;
use crate::services::nearby_service::NearbyLocator;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub voucher_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub scan_source: ScanSource,
    pub location: Option<GeoPoint>,
    pub device_info: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub voucher: Voucher,
    /// `None` when the analytics row could not be written.
    pub scan_id: Option<Uuid>,
    pub can_claim: bool,
    pub already_claimed: bool,
    pub nearby_locations: Option<Vec<NearbyLocation>>,
}

/// Read path behind a scan or view. Writes only the analytics row, and only
/// on a best-effort basis.
pub struct ScanTracker {
    store: Arc<dyn VoucherStore>,
    clock: Arc<dyn Clock>,
    nearby: Arc<dyn NearbyLocator>,
}

impl ScanTracker {
    pub fn new(
        store: Arc<dyn VoucherStore>,
        clock: Arc<dyn Clock>,
        nearby: Arc<dyn NearbyLocator>,
    ) -> Self {
        Self {
            store,
            clock,
            nearby,
        }
    }

    pub async fn track_scan(&self, req: ScanRequest) -> Result<ScanOutcome, VoucherError> {
        let voucher = self
            .store
            .get_voucher(req.voucher_id)
            .await?
            .ok_or(VoucherError::not_found("voucher"))?;

        let now = self.clock.now();
        let already_claimed = match req.customer_id {
            Some(customer_id) => self
                .store
                .find_claim(req.voucher_id, customer_id)
                .await?
                .is_some(),
            None => false,
        };
        let can_claim = voucher.availability(now).is_available() && !already_claimed;

        let scan = NewScan {
            voucher_id: req.voucher_id,
            customer_id: req.customer_id,
            scan_source: req.scan_source,
            location: req.location,
            device_info: req.device_info,
            scanned_at: now,
        };
        let scan_id = match self.store.insert_scan(&scan).await {
            Ok(row) => Some(row.id),
            Err(e) => {
                warn!(voucher_id = %req.voucher_id, error = %e, "Failed to record scan");
                None
            }
        };

        let nearby_locations = match req.location.or_else(|| voucher.location()) {
            Some(origin) => match self.nearby.nearby(voucher.provider_id, origin).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(voucher_id = %req.voucher_id, error = %e, "Nearby lookup failed");
                    None
                }
            },
            None => None,
        };

        debug!(
            voucher_id = %req.voucher_id,
            anonymous = req.customer_id.is_none(),
            can_claim,
            already_claimed,
            "Scan tracked"
        );

        Ok(ScanOutcome {
            voucher,
            scan_id,
            can_claim,
            already_claimed,
            nearby_locations,
        })
    }
}
