use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::VoucherRedemption;

#[derive(Debug, Clone)]
pub struct RedemptionRepository {
    pool: PgPool,
}

impl RedemptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(
        &self,
        voucher_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM voucher_redemptions
            WHERE voucher_id = $1 AND ($2::uuid IS NULL OR customer_id = $2)
            "#,
        )
        .bind(voucher_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_for_customer_in(
        conn: &mut PgConnection,
        voucher_id: Uuid,
        customer_id: Uuid,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM voucher_redemptions WHERE voucher_id = $1 AND customer_id = $2",
        )
        .bind(voucher_id)
        .bind(customer_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    pub async fn insert_in(
        conn: &mut PgConnection,
        voucher_id: Uuid,
        customer_id: Uuid,
        code_id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<VoucherRedemption, StoreError> {
        let rec = sqlx::query_as::<_, VoucherRedemption>(
            r#"
            INSERT INTO voucher_redemptions (id, voucher_id, customer_id, code_id, redeemed_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(voucher_id)
        .bind(customer_id)
        .bind(code_id)
        .bind(redeemed_at)
        .fetch_one(conn)
        .await?;
        Ok(rec)
    }
}
