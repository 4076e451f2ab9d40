//! Storage error types.

use thiserror::Error;

/// Errors raised by a [`Store`](super::Store) or one of its transactions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Driver or connection failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint rejected the write
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// A check constraint rejected the write
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    /// A row lock was not granted within the transaction's lock timeout
    #[error("Row lock not available")]
    LockTimeout,
}

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
                return StoreError::LockTimeout;
            }
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
            if db_err.is_check_violation() {
                return StoreError::CheckViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
