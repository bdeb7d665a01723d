use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewScan, VoucherScan};

#[derive(Debug, Clone)]
pub struct ScanRepository {
    pool: PgPool,
}

impl ScanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewScan) -> Result<VoucherScan, StoreError> {
        let rec = sqlx::query_as::<_, VoucherScan>(
            r#"
            INSERT INTO voucher_scans (
                id, voucher_id, customer_id, scan_source, latitude, longitude, device_info, scanned_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.voucher_id)
        .bind(new.customer_id)
        .bind(new.scan_source)
        .bind(new.location.map(|l| l.latitude))
        .bind(new.location.map(|l| l.longitude))
        .bind(Json(&new.device_info))
        .bind(new.scanned_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    pub async fn count_by_voucher(&self, voucher_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voucher_scans WHERE voucher_id = $1")
            .bind(voucher_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
