use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;
use voucher_db::VoucherStore;
use voucher_db::models::{CodeType, NewVoucher, TextPatch, Voucher, VoucherCode, VoucherFilter};
use voucher_shared::api::VoucherStats;

use crate::clock::Clock;
use crate::error::VoucherError;
use crate::services::code_issuer::CodeIssuer;

/// Admin and read side of the voucher lifecycle.
pub struct VoucherService {
    store: Arc<dyn VoucherStore>,
    clock: Arc<dyn Clock>,
    issuer: CodeIssuer,
    default_code_types: Vec<CodeType>,
}

impl VoucherService {
    pub fn new(
        store: Arc<dyn VoucherStore>,
        clock: Arc<dyn Clock>,
        issuer: CodeIssuer,
        default_code_types: Vec<CodeType>,
    ) -> Self {
        Self {
            store,
            clock,
            issuer,
            default_code_types,
        }
    }

    pub async fn create_voucher(
        &self,
        new: NewVoucher,
    ) -> Result<(Voucher, Vec<VoucherCode>), VoucherError> {
        new.validate().map_err(VoucherError::Validation)?;

        let id = Uuid::new_v4();
        let voucher = self.store.insert_voucher(id, &new).await?;
        info!(voucher_id = %id, provider_id = %voucher.provider_id, "Voucher created");

        let types = if new.code_types.is_empty() {
            &self.default_code_types
        } else {
            &new.code_types
        };
        let codes = match self.issuer.issue(id, types).await {
            Ok(codes) => codes,
            Err(e) => {
                error!(voucher_id = %id, error = %e, "Code issuance failed for new voucher");
                return Err(e);
            }
        };

        Ok((voucher, codes))
    }

    /// Makes the validity window reachable now. A voucher whose window already
    /// started is returned untouched.
    pub async fn publish_voucher(&self, id: Uuid) -> Result<Voucher, VoucherError> {
        let voucher = self.get_voucher(id).await?;
        let now = self.clock.now();

        if voucher.expires_at <= now {
            warn!(voucher_id = %id, "Publishing an expired voucher has no effect");
            return Ok(voucher);
        }
        if voucher.valid_from <= now {
            return Ok(voucher);
        }

        let published = self.store.set_valid_from(id, now).await?;
        info!(voucher_id = %id, "Voucher published");
        Ok(published)
    }

    pub async fn get_voucher(&self, id: Uuid) -> Result<Voucher, VoucherError> {
        self.store
            .get_voucher(id)
            .await?
            .ok_or(VoucherError::not_found("voucher"))
    }

    /// `available_only` is applied after the fetch, so a page may come back
    /// shorter than `limit`.
    pub async fn search(
        &self,
        filter: &VoucherFilter,
        available_only: bool,
    ) -> Result<Vec<Voucher>, VoucherError> {
        let mut vouchers = self.store.search_vouchers(filter).await?;
        if available_only {
            let now = self.clock.now();
            vouchers.retain(|v| v.availability(now).is_available() && !v.is_sold_out());
        }
        Ok(vouchers)
    }

    pub async fn update_text(&self, id: Uuid, patch: &TextPatch) -> Result<Voucher, VoucherError> {
        if patch.is_empty() {
            return Err(VoucherError::Validation(
                "patch must contain title, description or terms".to_string(),
            ));
        }
        let voucher = self.store.update_voucher_text(id, patch).await?;
        info!(voucher_id = %id, "Voucher texts updated");
        Ok(voucher)
    }

    pub async fn stats(&self, id: Uuid) -> Result<VoucherStats, VoucherError> {
        let voucher = self.get_voucher(id).await?;
        let redemption_rows = self.store.count_redemptions(id, None).await?;
        let scans = self.store.count_scans(id).await?;
        let codes = self.store.list_codes(id).await?;

        Ok(VoucherStats {
            voucher_id: id,
            status: voucher.status(self.clock.now()).as_str().to_string(),
            current_redemptions: voucher.current_redemptions,
            redemption_rows,
            remaining_redemptions: voucher.remaining_redemptions(),
            scans,
            active_codes: codes.iter().filter(|c| c.is_active).count(),
        })
    }

    pub async fn list_codes(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, VoucherError> {
        self.get_voucher(voucher_id).await?;
        Ok(self.store.list_codes(voucher_id).await?)
    }

    pub async fn issue_codes(
        &self,
        voucher_id: Uuid,
        types: &[CodeType],
    ) -> Result<Vec<VoucherCode>, VoucherError> {
        if types.is_empty() {
            return Err(VoucherError::Validation("no code types requested".to_string()));
        }
        self.get_voucher(voucher_id).await?;
        self.issuer.issue(voucher_id, types).await
    }

    pub async fn set_code_active(
        &self,
        code_id: Uuid,
        active: bool,
    ) -> Result<VoucherCode, VoucherError> {
        let code = self.store.set_code_active(code_id, active).await?;
        info!(code_id = %code_id, voucher_id = %code.voucher_id, active, "Code activation changed");
        Ok(code)
    }
}
