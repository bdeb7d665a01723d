use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::guard::check_redemption;
use crate::models::{
    CodeType, NewClaim, NewScan, NewVoucher, RedemptionAttempt, RedemptionReceipt, TextPatch,
    Voucher, VoucherClaim, VoucherCode, VoucherFilter, VoucherScan,
};
use crate::repositories::claim_repo::ClaimRepository;
use crate::repositories::code_repo::CodeRepository;
use crate::repositories::redemption_repo::RedemptionRepository;
use crate::repositories::scan_repo::ScanRepository;
use crate::repositories::voucher_repo::VoucherRepository;
use crate::store::VoucherStore;

/// Per-transaction bounds applied with `SET LOCAL` semantics.
#[derive(Debug, Clone, Copy)]
pub struct TxSettings {
    pub lock_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2_000),
            statement_timeout: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgVoucherStore {
    pool: PgPool,
    settings: TxSettings,
    voucher_repo: VoucherRepository,
    code_repo: CodeRepository,
    claim_repo: ClaimRepository,
    redemption_repo: RedemptionRepository,
    scan_repo: ScanRepository,
}

impl PgVoucherStore {
    pub fn new(pool: PgPool, settings: TxSettings) -> Self {
        Self {
            voucher_repo: VoucherRepository::new(pool.clone()),
            code_repo: CodeRepository::new(pool.clone()),
            claim_repo: ClaimRepository::new(pool.clone()),
            redemption_repo: RedemptionRepository::new(pool.clone()),
            scan_repo: ScanRepository::new(pool.clone()),
            pool,
            settings,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn apply_timeouts(&self, conn: &mut PgConnection) -> Result<(), StoreError> {
        sqlx::query("SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $2, true)")
            .bind(format!("{}ms", self.settings.lock_timeout.as_millis()))
            .bind(format!("{}ms", self.settings.statement_timeout.as_millis()))
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VoucherStore for PgVoucherStore {
    async fn insert_voucher(&self, id: Uuid, new: &NewVoucher) -> Result<Voucher, StoreError> {
        self.voucher_repo.create(id, new).await
    }

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        self.voucher_repo.get_by_id(id).await
    }

    async fn search_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, StoreError> {
        self.voucher_repo.search(filter).await
    }

    async fn update_voucher_text(
        &self,
        id: Uuid,
        patch: &TextPatch,
    ) -> Result<Voucher, StoreError> {
        let mut tx = self.pool.begin().await?;
        self.apply_timeouts(&mut tx).await?;

        let mut voucher = VoucherRepository::lock_by_id(&mut tx, id)
            .await?
            .ok_or(StoreError::not_found("voucher"))?;
        voucher.apply_text_patch(patch);
        let updated = VoucherRepository::write_texts(&mut tx, &voucher).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_valid_from(
        &self,
        id: Uuid,
        valid_from: DateTime<Utc>,
    ) -> Result<Voucher, StoreError> {
        self.voucher_repo
            .set_valid_from(id, valid_from)
            .await?
            .ok_or(StoreError::not_found("voucher"))
    }

    async fn insert_code(
        &self,
        voucher_id: Uuid,
        code: &str,
        code_type: CodeType,
    ) -> Result<VoucherCode, StoreError> {
        self.code_repo.create(voucher_id, code, code_type).await
    }

    async fn find_code(&self, code: &str) -> Result<Option<VoucherCode>, StoreError> {
        self.code_repo.find_by_code(code).await
    }

    async fn list_codes(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, StoreError> {
        self.code_repo.list_by_voucher(voucher_id).await
    }

    async fn set_code_active(
        &self,
        code_id: Uuid,
        active: bool,
    ) -> Result<VoucherCode, StoreError> {
        self.code_repo
            .set_active(code_id, active)
            .await?
            .ok_or(StoreError::not_found("code"))
    }

    async fn insert_claim(&self, new: &NewClaim) -> Result<VoucherClaim, StoreError> {
        self.claim_repo.create(new).await
    }

    async fn find_claim(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<VoucherClaim>, StoreError> {
        self.claim_repo.find(voucher_id, customer_id).await
    }

    async fn list_claims(&self, customer_id: Uuid) -> Result<Vec<VoucherClaim>, StoreError> {
        self.claim_repo.list_by_customer(customer_id).await
    }

    async fn commit_redemption(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<RedemptionReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;
        self.apply_timeouts(&mut tx).await?;

        // Sole serialization point per voucher. Everything below reads state
        // that cannot change until commit or rollback.
        let voucher = VoucherRepository::lock_by_id(&mut tx, attempt.voucher_id)
            .await?
            .ok_or(StoreError::not_found("voucher"))?;

        let code = CodeRepository::find_by_code_in(&mut tx, &attempt.code).await?;
        let customer_redemptions = RedemptionRepository::count_for_customer_in(
            &mut tx,
            attempt.voucher_id,
            attempt.customer_id,
        )
        .await?;

        if let Err(rejection) = check_redemption(
            &voucher,
            code.as_ref(),
            attempt.voucher_id,
            customer_redemptions,
            attempt.now,
        ) {
            debug!(voucher_id = %attempt.voucher_id, customer_id = %attempt.customer_id, ?rejection, "Redemption rejected under lock");
            tx.rollback().await?;
            return Err(StoreError::Rejected(rejection));
        }

        // check_redemption only passes with a matching active code.
        let code = code.ok_or(StoreError::not_found("code"))?;

        let redemption = RedemptionRepository::insert_in(
            &mut tx,
            attempt.voucher_id,
            attempt.customer_id,
            code.id,
            attempt.now,
        )
        .await?;
        let current_redemptions =
            VoucherRepository::increment_redemptions(&mut tx, attempt.voucher_id).await?;

        tx.commit().await?;

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
        self.redemption_repo.count(voucher_id, customer_id).await
    }

    async fn insert_scan(&self, new: &NewScan) -> Result<VoucherScan, StoreError> {
        self.scan_repo.create(new).await
    }

    async fn count_scans(&self, voucher_id: Uuid) -> Result<i64, StoreError> {
        self.scan_repo.count_by_voucher(voucher_id).await
    }
}
