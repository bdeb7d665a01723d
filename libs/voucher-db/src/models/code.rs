use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "voucher_code_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeType {
    Short,
    Qr,
    Static,
}

impl CodeType {
    pub const ALL: [CodeType; 3] = [CodeType::Short, CodeType::Qr, CodeType::Static];

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Short => "SHORT",
            CodeType::Qr => "QR",
            CodeType::Static => "STATIC",
        }
    }
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHORT" => Ok(CodeType::Short),
            "QR" => Ok(CodeType::Qr),
            "STATIC" => Ok(CodeType::Static),
            other => Err(format!("unknown code type '{}'", other)),
        }
    }
}

/// A redemption code. Shared by every customer of the voucher, not a
/// single-use token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoucherCode {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub code: String,
    pub code_type: CodeType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl VoucherCode {
    pub fn belongs_to(&self, voucher_id: Uuid) -> bool {
        self.voucher_id == voucher_id
    }
}

/// Trims the presented code and upper-cases anything that is not a URL
/// payload. Issued short and static codes are upper-case only.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        trimmed.to_uppercase()
    }
}
