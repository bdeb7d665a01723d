use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use voucher_db::models::CodeType;
use voucher_db::{RedemptionRejection, StoreError};
use voucher_shared::api::ErrorBody;

#[derive(Debug, Error)]
pub enum VoucherError {
    // --- Lookup ---
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    // --- Business rules, terminal ---
    #[error("code is unknown, inactive or belongs to another voucher")]
    InvalidCode,
    #[error("voucher is not valid yet")]
    NotYetValid,
    #[error("voucher has expired")]
    Expired,
    #[error("voucher is already in the customer's wallet")]
    AlreadyClaimed,
    #[error("voucher is sold out")]
    SoldOut,
    #[error("customer reached the per-customer redemption limit")]
    PerUserLimitExceeded,

    // --- Contention ---
    #[error("voucher is busy, try again")]
    TransientConcurrency,

    // --- Issuance ---
    #[error("could not issue a unique {code_type} code after {attempts} attempts")]
    CodeGenerationExhausted { code_type: CodeType, attempts: u32 },

    // --- Collaborators ---
    #[error("external service failed: {0}")]
    ExternalService(String),

    // --- Input / internals ---
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error")]
    Internal,
}

impl VoucherError {
    pub fn not_found(entity: &'static str) -> Self {
        VoucherError::NotFound { entity }
    }

    /// Stable machine readable kind used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            VoucherError::NotFound { .. } => "NOT_FOUND",
            VoucherError::InvalidCode => "INVALID_CODE",
            VoucherError::NotYetValid => "NOT_YET_VALID",
            VoucherError::Expired => "EXPIRED",
            VoucherError::AlreadyClaimed => "ALREADY_CLAIMED",
            VoucherError::SoldOut => "SOLD_OUT",
            VoucherError::PerUserLimitExceeded => "PER_USER_LIMIT_EXCEEDED",
            VoucherError::TransientConcurrency => "TRANSIENT_CONCURRENCY",
            VoucherError::CodeGenerationExhausted { .. } => "CODE_GENERATION_EXHAUSTED",
            VoucherError::ExternalService(_) => "EXTERNAL_SERVICE",
            VoucherError::Validation(_) => "VALIDATION",
            VoucherError::Internal => "INTERNAL",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoucherError::TransientConcurrency | VoucherError::ExternalService(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            VoucherError::NotFound { .. } => StatusCode::NOT_FOUND,
            VoucherError::InvalidCode => StatusCode::UNPROCESSABLE_ENTITY,
            VoucherError::NotYetValid => StatusCode::CONFLICT,
            VoucherError::Expired => StatusCode::GONE,
            VoucherError::AlreadyClaimed => StatusCode::CONFLICT,
            VoucherError::SoldOut => StatusCode::CONFLICT,
            VoucherError::PerUserLimitExceeded => StatusCode::FORBIDDEN,
            VoucherError::TransientConcurrency => StatusCode::SERVICE_UNAVAILABLE,
            VoucherError::CodeGenerationExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            VoucherError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            VoucherError::Validation(_) => StatusCode::BAD_REQUEST,
            VoucherError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<RedemptionRejection> for VoucherError {
    fn from(rejection: RedemptionRejection) -> Self {
        match rejection {
            RedemptionRejection::InvalidCode => VoucherError::InvalidCode,
            RedemptionRejection::NotYetValid => VoucherError::NotYetValid,
            RedemptionRejection::Expired => VoucherError::Expired,
            RedemptionRejection::PerUserLimitExceeded => VoucherError::PerUserLimitExceeded,
            RedemptionRejection::SoldOut => VoucherError::SoldOut,
        }
    }
}

impl From<StoreError> for VoucherError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity } => VoucherError::NotFound { entity },
            StoreError::LockTimeout | StoreError::Conflict => VoucherError::TransientConcurrency,
            StoreError::Rejected(rejection) => rejection.into(),
            other => {
                error!(error = %other, "Unexpected storage error");
                VoucherError::Internal
            }
        }
    }
}

impl IntoResponse for VoucherError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
