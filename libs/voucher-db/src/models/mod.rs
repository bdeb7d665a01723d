pub mod claim;
pub mod code;
pub mod redemption;
pub mod scan;
pub mod voucher;

pub use claim::{NewClaim, NotificationPreferences, VoucherClaim};
pub use code::{CodeType, VoucherCode, normalize_code};
pub use redemption::{RedemptionAttempt, RedemptionReceipt, VoucherRedemption};
pub use scan::{NewScan, ScanSource, VoucherScan};
pub use voucher::{
    DiscountType, GeoPoint, LocalizedText, NewVoucher, TextPatch, Voucher, VoucherFilter,
};

#[cfg(test)]
pub(crate) fn test_voucher(max_redemptions: Option<i32>, per_user: i32) -> Voucher {
    use chrono::{Duration, Utc};
    use sqlx::types::Json;

    let now = Utc::now();
    Voucher {
        id: uuid::Uuid::new_v4(),
        provider_id: uuid::Uuid::new_v4(),
        category_id: None,
        title: Json(LocalizedText::new()),
        description: Json(LocalizedText::new()),
        terms: Json(LocalizedText::new()),
        discount_type: DiscountType::Percentage,
        discount_value: 10.0,
        currency: Some("EUR".to_string()),
        latitude: None,
        longitude: None,
        valid_from: now - Duration::days(1),
        expires_at: now + Duration::days(1),
        max_redemptions,
        max_redemptions_per_user: per_user,
        current_redemptions: 0,
        created_at: now,
        updated_at: now,
    }
}
