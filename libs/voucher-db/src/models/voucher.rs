use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::availability::{Availability, VoucherStatus};
use crate::models::code::CodeType;

/// Language tag -> text, e.g. `{"en": "Free coffee", "de": "Gratis Kaffee"}`.
pub type LocalizedText = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "voucher_discount_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    FreeItem,
    BuyOneGetOne,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::FixedAmount => "FIXED_AMOUNT",
            DiscountType::FreeItem => "FREE_ITEM",
            DiscountType::BuyOneGetOne => "BUY_ONE_GET_ONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: Json<LocalizedText>,
    pub description: Json<LocalizedText>,
    pub terms: Json<LocalizedText>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub currency: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub valid_from: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub max_redemptions: Option<i32>,
    pub max_redemptions_per_user: i32,
    pub current_redemptions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        Availability::evaluate(self.valid_from, self.expires_at, now)
    }

    pub fn is_sold_out(&self) -> bool {
        matches!(self.max_redemptions, Some(max) if self.current_redemptions >= max)
    }

    /// Remaining global capacity, `None` when the voucher is unbounded.
    pub fn remaining_redemptions(&self) -> Option<i32> {
        self.max_redemptions
            .map(|max| (max - self.current_redemptions).max(0))
    }

    pub fn status(&self, now: DateTime<Utc>) -> VoucherStatus {
        VoucherStatus::derive(self.availability(now), self.is_sold_out())
    }

    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        }
    }

    /// Overlays the supplied languages onto the current texts. Languages absent
    /// from the patch are kept as they are.
    pub fn apply_text_patch(&mut self, patch: &TextPatch) {
        merge_languages(&mut self.title.0, patch.title.as_ref());
        merge_languages(&mut self.description.0, patch.description.as_ref());
        merge_languages(&mut self.terms.0, patch.terms.as_ref());
    }
}

fn merge_languages(target: &mut LocalizedText, patch: Option<&LocalizedText>) {
    if let Some(patch) = patch {
        for (lang, text) in patch {
            target.insert(lang.clone(), text.clone());
        }
    }
}

/// Payload handed over by the publisher when a voucher is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoucher {
    pub provider_id: Uuid,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub terms: LocalizedText,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub valid_from: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub max_redemptions: Option<i32>,
    #[serde(default = "default_per_user")]
    pub max_redemptions_per_user: i32,
    #[serde(default)]
    pub code_types: Vec<CodeType>,
}

fn default_per_user() -> i32 {
    1
}

impl NewVoucher {
    /// Checks the invariants the store relies on. Returns a human readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.valid_from >= self.expires_at {
            return Err("valid_from must be before expires_at".to_string());
        }
        if self.max_redemptions_per_user < 1 {
            return Err("max_redemptions_per_user must be at least 1".to_string());
        }
        if let Some(max) = self.max_redemptions {
            if max < 0 {
                return Err("max_redemptions must not be negative".to_string());
            }
        }
        if !self.discount_value.is_finite() || self.discount_value < 0.0 {
            return Err("discount_value must be a non-negative number".to_string());
        }
        Ok(())
    }
}

/// Partial multilingual update. Only the languages present are touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextPatch {
    #[serde(default)]
    pub title: Option<LocalizedText>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub terms: Option<LocalizedText>,
}

impl TextPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.terms.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherFilter {
    #[serde(default)]
    pub provider_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl VoucherFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
