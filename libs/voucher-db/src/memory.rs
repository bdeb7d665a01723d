//! In-process store with the same locking semantics as Postgres.
//!
//! Each voucher has its own async mutex standing in for the row lock taken by
//! `SELECT ... FOR UPDATE`. Table maps sit behind short-lived `RwLock`s, so
//! readers see the last committed state without waiting for a redemption in
//! flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::StoreError;
use crate::guard::check_redemption;
use crate::models::{
    CodeType, NewClaim, NewScan, NewVoucher, RedemptionAttempt, RedemptionReceipt, TextPatch,
    Voucher, VoucherClaim, VoucherCode, VoucherFilter, VoucherRedemption, VoucherScan,
};
use crate::store::VoucherStore;

#[derive(Debug, Default)]
struct Tables {
    vouchers: HashMap<Uuid, Voucher>,
    codes: HashMap<Uuid, VoucherCode>,
    code_index: HashMap<String, Uuid>,
    claims: HashMap<(Uuid, Uuid), VoucherClaim>,
    redemptions: Vec<VoucherRedemption>,
    scans: Vec<VoucherScan>,
}

#[derive(Debug)]
pub struct InMemoryVoucherStore {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
}

impl Default for InMemoryVoucherStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(2_000))
    }
}

impl InMemoryVoucherStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            row_locks: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    /// Row locks exist only for inserted vouchers, so unknown ids leave no trace.
    async fn row_lock(&self, voucher_id: Uuid) -> Result<Arc<Mutex<()>>, StoreError> {
        self.row_locks
            .lock()
            .await
            .get(&voucher_id)
            .cloned()
            .ok_or(StoreError::not_found("voucher"))
    }

    /// Number of scan rows recorded for a voucher.
    pub async fn scan_rows(&self, voucher_id: Uuid) -> usize {
        let tables = self.tables.read().await;
        tables
            .scans
            .iter()
            .filter(|s| s.voucher_id == voucher_id)
            .count()
    }

    /// Redemption rows for a voucher, in commit order.
    pub async fn redemption_rows(&self, voucher_id: Uuid) -> Vec<VoucherRedemption> {
        let tables = self.tables.read().await;
        tables
            .redemptions
            .iter()
            .filter(|r| r.voucher_id == voucher_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn insert_voucher(&self, id: Uuid, new: &NewVoucher) -> Result<Voucher, StoreError> {
        let now = Utc::now();
        let voucher = Voucher {
            id,
            provider_id: new.provider_id,
            category_id: new.category_id,
            title: Json(new.title.clone()),
            description: Json(new.description.clone()),
            terms: Json(new.terms.clone()),
            discount_type: new.discount_type,
            discount_value: new.discount_value,
            currency: new.currency.clone(),
            latitude: new.location.map(|l| l.latitude),
            longitude: new.location.map(|l| l.longitude),
            valid_from: new.valid_from,
            expires_at: new.expires_at,
            max_redemptions: new.max_redemptions,
            max_redemptions_per_user: new.max_redemptions_per_user,
            current_redemptions: 0,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.tables.write().await;
        if tables.vouchers.contains_key(&id) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("vouchers_pkey".to_string()),
            });
        }
        tables.vouchers.insert(id, voucher.clone());
        drop(tables);

        self.row_locks.lock().await.insert(id, Arc::default());
        Ok(voucher)
    }

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        Ok(self.tables.read().await.vouchers.get(&id).cloned())
    }

    async fn search_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, StoreError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<Voucher> = tables
            .vouchers
            .values()
            .filter(|v| filter.provider_id.is_none_or(|p| v.provider_id == p))
            .filter(|v| filter.category_id.is_none_or(|c| v.category_id == Some(c)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(filter.offset()).unwrap_or(0);
        let limit = usize::try_from(filter.limit()).unwrap_or(0);
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_voucher_text(
        &self,
        id: Uuid,
        patch: &TextPatch,
    ) -> Result<Voucher, StoreError> {
        let row = self.row_lock(id).await?;
        let _held = tokio::time::timeout(self.lock_timeout, row.lock())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        let mut tables = self.tables.write().await;
        let voucher = tables
            .vouchers
            .get_mut(&id)
            .ok_or(StoreError::not_found("voucher"))?;
        voucher.apply_text_patch(patch);
        voucher.updated_at = Utc::now();
        Ok(voucher.clone())
    }

    async fn set_valid_from(
        &self,
        id: Uuid,
        valid_from: DateTime<Utc>,
    ) -> Result<Voucher, StoreError> {
        let mut tables = self.tables.write().await;
        let voucher = tables
            .vouchers
            .get_mut(&id)
            .ok_or(StoreError::not_found("voucher"))?;
        voucher.valid_from = valid_from;
        voucher.updated_at = Utc::now();
        Ok(voucher.clone())
    }

    async fn insert_code(
        &self,
        voucher_id: Uuid,
        code: &str,
        code_type: CodeType,
    ) -> Result<VoucherCode, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.vouchers.contains_key(&voucher_id) {
            return Err(StoreError::not_found("voucher"));
        }
        if tables.code_index.contains_key(code) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("voucher_codes_code_key".to_string()),
            });
        }

        let rec = VoucherCode {
            id: Uuid::new_v4(),
            voucher_id,
            code: code.to_string(),
            code_type,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.code_index.insert(rec.code.clone(), rec.id);
        tables.codes.insert(rec.id, rec.clone());
        Ok(rec)
    }

    async fn find_code(&self, code: &str) -> Result<Option<VoucherCode>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .code_index
            .get(code)
            .and_then(|id| tables.codes.get(id))
            .cloned())
    }

    async fn list_codes(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, StoreError> {
        let tables = self.tables.read().await;
        let mut codes: Vec<VoucherCode> = tables
            .codes
            .values()
            .filter(|c| c.voucher_id == voucher_id)
            .cloned()
            .collect();
        codes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
        Ok(codes)
    }

    async fn set_code_active(
        &self,
        code_id: Uuid,
        active: bool,
    ) -> Result<VoucherCode, StoreError> {
        let mut tables = self.tables.write().await;
        let code = tables
            .codes
            .get_mut(&code_id)
            .ok_or(StoreError::not_found("code"))?;
        code.is_active = active;
        Ok(code.clone())
    }

    async fn insert_claim(&self, new: &NewClaim) -> Result<VoucherClaim, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.vouchers.contains_key(&new.voucher_id) {
            return Err(StoreError::not_found("voucher"));
        }
        let key = (new.voucher_id, new.customer_id);
        if tables.claims.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("voucher_claims_voucher_customer_key".to_string()),
            });
        }

        let existing = tables
            .claims
            .values()
            .filter(|c| c.customer_id == new.customer_id)
            .count();
        let claim = VoucherClaim {
            id: Uuid::new_v4(),
            voucher_id: new.voucher_id,
            customer_id: new.customer_id,
            claimed_at: new.claimed_at,
            wallet_position: i32::try_from(existing).unwrap_or(i32::MAX - 1) + 1,
            notify_before_expiry: new.preferences.notify_before_expiry,
            notify_nearby: new.preferences.notify_nearby,
        };
        tables.claims.insert(key, claim.clone());
        Ok(claim)
    }

    async fn find_claim(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<VoucherClaim>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.claims.get(&(voucher_id, customer_id)).cloned())
    }

    async fn list_claims(&self, customer_id: Uuid) -> Result<Vec<VoucherClaim>, StoreError> {
        let tables = self.tables.read().await;
        let mut claims: Vec<VoucherClaim> = tables
            .claims
            .values()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect();
        claims.sort_by_key(|c| (c.wallet_position, c.claimed_at));
        Ok(claims)
    }

    async fn commit_redemption(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<RedemptionReceipt, StoreError> {
        let row = self.row_lock(attempt.voucher_id).await?;
        let _held = tokio::time::timeout(self.lock_timeout, row.lock())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        // Snapshot under the row lock. No other redemption of this voucher can
        // run until `_held` drops.
        let (voucher, code, customer_redemptions) = {
            let tables = self.tables.read().await;
            let voucher = tables
                .vouchers
                .get(&attempt.voucher_id)
                .cloned()
                .ok_or(StoreError::not_found("voucher"))?;
            let code = tables
                .code_index
                .get(&attempt.code)
                .and_then(|id| tables.codes.get(id))
                .cloned();
            let count = tables
                .redemptions
                .iter()
                .filter(|r| {
                    r.voucher_id == attempt.voucher_id && r.customer_id == attempt.customer_id
                })
                .count();
            (voucher, code, i64::try_from(count).unwrap_or(i64::MAX))
        };

        check_redemption(
            &voucher,
            code.as_ref(),
            attempt.voucher_id,
            customer_redemptions,
            attempt.now,
        )
        .map_err(StoreError::Rejected)?;
        let code = code.ok_or(StoreError::not_found("code"))?;

        let redemption = VoucherRedemption {
            id: Uuid::new_v4(),
            voucher_id: attempt.voucher_id,
            customer_id: attempt.customer_id,
            code_id: code.id,
            redeemed_at: attempt.now,
        };

        let mut tables = self.tables.write().await;
        let stored = tables
            .vouchers
            .get_mut(&attempt.voucher_id)
            .ok_or(StoreError::not_found("voucher"))?;
        stored.current_redemptions += 1;
        stored.updated_at = attempt.now;
        let current_redemptions = stored.current_redemptions;
        tables.redemptions.push(redemption.clone());

        Ok(RedemptionReceipt {
            redemption,
            current_redemptions,
            max_redemptions: voucher.max_redemptions,
            customer_redemptions: customer_redemptions + 1,
            max_redemptions_per_user: voucher.max_redemptions_per_user,
        })
    }

    async fn count_redemptions(
        &self,
        voucher_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .redemptions
            .iter()
            .filter(|r| r.voucher_id == voucher_id)
            .filter(|r| customer_id.is_none_or(|c| r.customer_id == c))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn insert_scan(&self, new: &NewScan) -> Result<VoucherScan, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.vouchers.contains_key(&new.voucher_id) {
            return Err(StoreError::not_found("voucher"));
        }
        let scan = VoucherScan {
            id: Uuid::new_v4(),
            voucher_id: new.voucher_id,
            customer_id: new.customer_id,
            scan_source: new.scan_source,
            latitude: new.location.map(|l| l.latitude),
            longitude: new.location.map(|l| l.longitude),
            device_info: Json(new.device_info.clone()),
            scanned_at: new.scanned_at,
        };
        tables.scans.push(scan.clone());
        Ok(scan)
    }

    async fn count_scans(&self, voucher_id: Uuid) -> Result<i64, StoreError> {
        let count = self.scan_rows(voucher_id).await;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
