use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use voucher_db::models::{NewClaim, NotificationPreferences, Voucher, VoucherClaim};
use voucher_db::{Availability, StoreError, VoucherStore};

use crate::clock::Clock;
use crate::error::VoucherError;

pub struct ClaimService {
    store: Arc<dyn VoucherStore>,
    clock: Arc<dyn Clock>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn VoucherStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Puts the voucher into the customer's wallet. Claiming never touches
    /// redemption capacity. Concurrent claims for the same pair are settled by
    /// the unique constraint: one insert wins, the rest get `AlreadyClaimed`.
    pub async fn claim(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
        preferences: NotificationPreferences,
    ) -> Result<VoucherClaim, VoucherError> {
        let voucher = self
            .store
            .get_voucher(voucher_id)
            .await?
            .ok_or(VoucherError::not_found("voucher"))?;

        let now = self.clock.now();
        match voucher.availability(now) {
            Availability::Available => {}
            Availability::NotYetValid => return Err(VoucherError::NotYetValid),
            Availability::Expired => return Err(VoucherError::Expired),
        }

        let new = NewClaim {
            voucher_id,
            customer_id,
            claimed_at: now,
            preferences,
        };
        match self.store.insert_claim(&new).await {
            Ok(claim) => {
                info!(
                    %voucher_id,
                    %customer_id,
                    wallet_position = claim.wallet_position,
                    "Voucher claimed"
                );
                Ok(claim)
            }
            Err(StoreError::UniqueViolation { .. }) => {
                debug!(%voucher_id, %customer_id, "Duplicate claim rejected");
                Err(VoucherError::AlreadyClaimed)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The customer's claims by wallet position, each with its voucher.
    pub async fn wallet(&self, customer_id: Uuid) -> Result<Vec<(VoucherClaim, Voucher)>, VoucherError> {
        let claims = self.store.list_claims(customer_id).await?;
        let mut entries = Vec::with_capacity(claims.len());
        for claim in claims {
            if let Some(voucher) = self.store.get_voucher(claim.voucher_id).await? {
                entries.push((claim, voucher));
            }
        }
        Ok(entries)
    }
}
