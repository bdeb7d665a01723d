use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;
use voucher_db::models::{RedemptionAttempt, RedemptionReceipt, normalize_code};
use voucher_db::{StoreError, VoucherStore};

use crate::clock::Clock;
use crate::error::VoucherError;
use crate::retry::{RetryPolicy, retry_with_backoff_if};

pub struct RedemptionService {
    store: Arc<dyn VoucherStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RedemptionService {
    pub fn new(store: Arc<dyn VoucherStore>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Consumes one unit of the voucher's capacity for `customer_id`.
    ///
    /// All preconditions are evaluated by the store inside the transaction
    /// that holds the voucher row lock, so nothing read here before the call
    /// can let a request through. Lock timeouts and serialization conflicts
    /// are retried with backoff; business rejections are returned as-is on
    /// the first attempt.
    pub async fn redeem(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
        raw_code: &str,
    ) -> Result<RedemptionReceipt, VoucherError> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(VoucherError::InvalidCode);
        }

        let outcome = retry_with_backoff_if(
            &self.policy,
            || {
                // Fresh "now" per attempt, a retry may land after expiry.
                let attempt = RedemptionAttempt {
                    voucher_id,
                    customer_id,
                    code: code.clone(),
                    now: self.clock.now(),
                };
                let store = Arc::clone(&self.store);
                async move { store.commit_redemption(&attempt).await }
            },
            StoreError::is_transient,
        )
        .await;

        match outcome {
            Ok(receipt) => {
                info!(
                    %voucher_id,
                    %customer_id,
                    redemption_id = %receipt.redemption.id,
                    current = receipt.current_redemptions,
                    "Voucher redeemed"
                );
                if receipt.exhausted() {
                    info!(%voucher_id, "Voucher sold out");
                }
                Ok(receipt)
            }
            Err(StoreError::Rejected(rejection)) => {
                info!(%voucher_id, %customer_id, ?rejection, "Redemption rejected");
                Err(rejection.into())
            }
            Err(e) if e.is_transient() => {
                warn!(
                    %voucher_id,
                    %customer_id,
                    retries = self.policy.max_retries,
                    error = %e,
                    "Redemption still contended after retries"
                );
                Err(VoucherError::TransientConcurrency)
            }
            Err(StoreError::NotFound { entity }) => Err(VoucherError::NotFound { entity }),
            Err(e) => {
                error!(%voucher_id, %customer_id, error = %e, "Redemption failed");
                Err(VoucherError::Internal)
            }
        }
    }
}
