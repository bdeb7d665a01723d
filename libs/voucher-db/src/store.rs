use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    CodeType, NewClaim, NewScan, NewVoucher, RedemptionAttempt, RedemptionReceipt, TextPatch,
    Voucher, VoucherClaim, VoucherCode, VoucherFilter, VoucherScan,
};

/// Durable storage of vouchers, codes, claims, redemptions and scans.
///
/// Reads never wait on the voucher row lock. `commit_redemption` is the only
/// operation that takes it and the only one that moves `current_redemptions`.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn insert_voucher(&self, id: Uuid, new: &NewVoucher) -> Result<Voucher, StoreError>;

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, StoreError>;

    async fn search_vouchers(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, StoreError>;

    /// Loads the current language maps under the row lock, overlays the patch
    /// and writes the merged maps back in the same transaction.
    async fn update_voucher_text(&self, id: Uuid, patch: &TextPatch)
    -> Result<Voucher, StoreError>;

    async fn set_valid_from(
        &self,
        id: Uuid,
        valid_from: DateTime<Utc>,
    ) -> Result<Voucher, StoreError>;

    /// Fails with `UniqueViolation` when the code string is already taken.
    async fn insert_code(
        &self,
        voucher_id: Uuid,
        code: &str,
        code_type: CodeType,
    ) -> Result<VoucherCode, StoreError>;

    async fn find_code(&self, code: &str) -> Result<Option<VoucherCode>, StoreError>;

    async fn list_codes(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, StoreError>;

    async fn set_code_active(&self, code_id: Uuid, active: bool)
    -> Result<VoucherCode, StoreError>;

    /// Fails with `UniqueViolation` when the pair already holds a claim.
    async fn insert_claim(&self, new: &NewClaim) -> Result<VoucherClaim, StoreError>;

    async fn find_claim(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<VoucherClaim>, StoreError>;

    async fn list_claims(&self, customer_id: Uuid) -> Result<Vec<VoucherClaim>, StoreError>;

    /// Locks the voucher row, re-evaluates every redemption precondition
    /// against the locked state and either records the redemption and bumps
    /// the counter by one, or writes nothing.
    async fn commit_redemption(
        &self,
        attempt: &RedemptionAttempt,
    ) -> Result<RedemptionReceipt, StoreError>;

    async fn count_redemptions(
        &self,
        voucher_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<i64, StoreError>;

    async fn insert_scan(&self, new: &NewScan) -> Result<VoucherScan, StoreError>;

    async fn count_scans(&self, voucher_id: Uuid) -> Result<i64, StoreError>;
}
