use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{CodeType, VoucherCode};

#[derive(Debug, Clone)]
pub struct CodeRepository {
    pool: PgPool,
}

impl CodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        voucher_id: Uuid,
        code: &str,
        code_type: CodeType,
    ) -> Result<VoucherCode, StoreError> {
        let rec = sqlx::query_as::<_, VoucherCode>(
            r#"
            INSERT INTO voucher_codes (id, voucher_id, code, code_type, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, voucher_id, code, code_type, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(voucher_id)
        .bind(code)
        .bind(code_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<VoucherCode>, StoreError> {
        let rec = sqlx::query_as::<_, VoucherCode>(
            "SELECT id, voucher_id, code, code_type, is_active, created_at FROM voucher_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    /// Same lookup inside an open transaction, so `is_active` is read from the
    /// transaction snapshot.
    pub async fn find_by_code_in(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<VoucherCode>, StoreError> {
        let rec = sqlx::query_as::<_, VoucherCode>(
            "SELECT id, voucher_id, code, code_type, is_active, created_at FROM voucher_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(conn)
        .await?;
        Ok(rec)
    }

    pub async fn list_by_voucher(&self, voucher_id: Uuid) -> Result<Vec<VoucherCode>, StoreError> {
        let recs = sqlx::query_as::<_, VoucherCode>(
            r#"
            SELECT id, voucher_id, code, code_type, is_active, created_at
            FROM voucher_codes
            WHERE voucher_id = $1
            ORDER BY created_at ASC, code ASC
            "#,
        )
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    pub async fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<Option<VoucherCode>, StoreError> {
        let rec = sqlx::query_as::<_, VoucherCode>(
            r#"
            UPDATE voucher_codes SET is_active = $1 WHERE id = $2
            RETURNING id, voucher_id, code, code_type, is_active, created_at
            "#,
        )
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }
}
