use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewClaim, VoucherClaim};

#[derive(Debug, Clone)]
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts under a per-customer advisory lock, so concurrent claims by one
    /// customer get distinct wallet positions. A concurrent duplicate surfaces
    /// as a unique violation on `voucher_claims_voucher_customer_key`.
    pub async fn create(&self, new: &NewClaim) -> Result<VoucherClaim, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(new.customer_id)
            .execute(&mut *tx)
            .await?;

        let rec = sqlx::query_as::<_, VoucherClaim>(
            r#"
            INSERT INTO voucher_claims (
                id, voucher_id, customer_id, claimed_at, wallet_position,
                notify_before_expiry, notify_nearby
            )
            VALUES (
                $1, $2, $3, $4,
                (SELECT COUNT(*)::INTEGER FROM voucher_claims WHERE customer_id = $3) + 1,
                $5, $6
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.voucher_id)
        .bind(new.customer_id)
        .bind(new.claimed_at)
        .bind(new.preferences.notify_before_expiry)
        .bind(new.preferences.notify_nearby)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rec)
    }

    pub async fn find(
        &self,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<VoucherClaim>, StoreError> {
        let rec = sqlx::query_as::<_, VoucherClaim>(
            "SELECT * FROM voucher_claims WHERE voucher_id = $1 AND customer_id = $2",
        )
        .bind(voucher_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    pub async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<VoucherClaim>, StoreError> {
        let recs = sqlx::query_as::<_, VoucherClaim>(
            "SELECT * FROM voucher_claims WHERE customer_id = $1 ORDER BY wallet_position ASC, claimed_at ASC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }
}
