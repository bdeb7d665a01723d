use thiserror::Error;

use crate::guard::RedemptionRejection;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error("transaction conflict, retry")]
    Conflict,

    #[error("redemption rejected: {0}")]
    Rejected(RedemptionRejection),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }

    /// Lock waits and serialization conflicts go away on retry; nothing else does.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout | StoreError::Conflict)
    }
}

/// SQLSTATE classes the store reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlState {
    UniqueViolation,
    LockNotAvailable,
    QueryCanceled,
    SerializationFailure,
    DeadlockDetected,
}

impl SqlState {
    pub fn classify(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(SqlState::UniqueViolation),
            "55P03" => Some(SqlState::LockNotAvailable),
            "57014" => Some(SqlState::QueryCanceled),
            "40001" => Some(SqlState::SerializationFailure),
            "40P01" => Some(SqlState::DeadlockDetected),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|code| SqlState::classify(&code))
                .map(|state| (state, db.constraint().map(str::to_owned))),
            sqlx::Error::PoolTimedOut => return StoreError::LockTimeout,
            _ => None,
        };

        match classified {
            Some((SqlState::UniqueViolation, constraint)) => {
                StoreError::UniqueViolation { constraint }
            }
            Some((SqlState::LockNotAvailable | SqlState::QueryCanceled, _)) => {
                StoreError::LockTimeout
            }
            Some((SqlState::SerializationFailure | SqlState::DeadlockDetected, _)) => {
                StoreError::Conflict
            }
            None => StoreError::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sqlstates() {
        assert_eq!(SqlState::classify("23505"), Some(SqlState::UniqueViolation));
        assert_eq!(SqlState::classify("55P03"), Some(SqlState::LockNotAvailable));
        assert_eq!(SqlState::classify("57014"), Some(SqlState::QueryCanceled));
        assert_eq!(SqlState::classify("40001"), Some(SqlState::SerializationFailure));
        assert_eq!(SqlState::classify("40P01"), Some(SqlState::DeadlockDetected));
        assert_eq!(SqlState::classify("42P01"), None);
    }

    #[test]
    fn only_lock_and_conflict_errors_are_transient() {
        assert!(StoreError::LockTimeout.is_transient());
        assert!(StoreError::Conflict.is_transient());
        assert!(!StoreError::Rejected(RedemptionRejection::SoldOut).is_transient());
        assert!(!StoreError::UniqueViolation { constraint: None }.is_transient());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn migration_failures_keep_their_own_variant() {
        let err = StoreError::from(sqlx::migrate::MigrateError::VersionMissing(20260101000000));
        assert!(matches!(err, StoreError::Migration(_)));
        assert!(!err.is_transient());
        assert!(err.to_string().starts_with("migration failed"));
    }

    #[test]
    fn pool_timeout_maps_to_lock_timeout() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::LockTimeout
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
