//! User error types.

use thiserror::Error;

use super::models::UserId;
use crate::db::StoreError;
use crate::wallet::WalletError;

/// User errors
#[derive(Debug, Error)]
pub enum UserError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Wallet provisioning failed
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// User not found
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Email already registered
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Malformed email
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Name missing or too long
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

impl UserError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            UserError::Store(_) => "Internal server error".to_string(),
            UserError::Wallet(e) => e.client_message(),
            UserError::UserNotFound(_) => "User not found".to_string(),
            UserError::EmailTaken(_) => "Email already registered".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for user operations
pub type UserResult<T> = Result<T, UserError>;
