use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewVoucher, Voucher, VoucherFilter};

#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: PgPool,
}

impl VoucherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, id: Uuid, new: &NewVoucher) -> Result<Voucher, StoreError> {
        let location = new.location;
        let voucher = sqlx::query_as::<_, Voucher>(
            r#"
            INSERT INTO vouchers (
                id, provider_id, category_id, title, description, terms,
                discount_type, discount_value, currency, latitude, longitude,
                valid_from, expires_at, max_redemptions, max_redemptions_per_user
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new.provider_id)
        .bind(new.category_id)
        .bind(Json(&new.title))
        .bind(Json(&new.description))
        .bind(Json(&new.terms))
        .bind(new.discount_type)
        .bind(new.discount_value)
        .bind(new.currency.as_deref())
        .bind(location.map(|l| l.latitude))
        .bind(location.map(|l| l.longitude))
        .bind(new.valid_from)
        .bind(new.expires_at)
        .bind(new.max_redemptions)
        .bind(new.max_redemptions_per_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(voucher)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Voucher>, StoreError> {
        let voucher = sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(voucher)
    }

    pub async fn search(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, StoreError> {
        let vouchers = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT * FROM vouchers
            WHERE ($1::uuid IS NULL OR provider_id = $1)
              AND ($2::uuid IS NULL OR category_id = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.provider_id)
        .bind(filter.category_id)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(vouchers)
    }

    pub async fn set_valid_from(
        &self,
        id: Uuid,
        valid_from: DateTime<Utc>,
    ) -> Result<Option<Voucher>, StoreError> {
        let voucher = sqlx::query_as::<_, Voucher>(
            "UPDATE vouchers SET valid_from = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
        )
        .bind(valid_from)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(voucher)
    }

    /// `SELECT ... FOR UPDATE`. Holds the row until the surrounding
    /// transaction ends.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Voucher>, StoreError> {
        let voucher =
            sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(voucher)
    }

    pub async fn increment_redemptions(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<i32, StoreError> {
        let current: i32 = sqlx::query_scalar(
            r#"
            UPDATE vouchers
            SET current_redemptions = current_redemptions + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING current_redemptions
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(current)
    }

    pub async fn write_texts(
        conn: &mut PgConnection,
        voucher: &Voucher,
    ) -> Result<Voucher, StoreError> {
        let updated = sqlx::query_as::<_, Voucher>(
            r#"
            UPDATE vouchers
            SET title = $1, description = $2, terms = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&voucher.title)
        .bind(&voucher.description)
        .bind(&voucher.terms)
        .bind(voucher.id)
        .fetch_one(conn)
        .await?;
        Ok(updated)
    }
}
