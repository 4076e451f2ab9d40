//! Wallet error types.

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use super::models::WalletId;
use crate::db::{StoreError, timeouts::TimeoutError};
use crate::user::UserId;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Wallet not found
    #[error("Wallet {0} not found")]
    WalletNotFound(WalletId),

    /// Operation kind is neither DEPOSIT nor WITHDRAW
    #[error("Invalid operation type: {0}")]
    InvalidOperation(String),

    /// Withdrawal larger than the current balance
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Resulting balance does not fit the storage precision
    #[error("Balance would exceed the maximum of {max}")]
    BalanceOverflow { max: Decimal },

    /// Owner already has a wallet
    #[error("User {0} already owns a wallet")]
    WalletAlreadyExists(UserId),

    /// Owner does not exist
    #[error("User {0} does not exist")]
    OwnerNotFound(UserId),

    /// Gave up waiting for another operation on the same wallet
    #[error("Timed out after {0:?} waiting for the wallet lock")]
    LockTimeout(Duration),
}

impl From<TimeoutError> for WalletError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(waited) => WalletError::LockTimeout(waited),
            TimeoutError::Store(e) => WalletError::Store(e),
        }
    }
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized to prevent information disclosure about
    /// the internal system structure, and wallet/user IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Store(_) => "Internal server error".to_string(),
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            WalletError::InsufficientFunds { .. } => "Insufficient funds".to_string(),
            WalletError::WalletAlreadyExists(_) => "User already owns a wallet".to_string(),
            WalletError::OwnerNotFound(_) => "User not found".to_string(),
            WalletError::LockTimeout(_) => "Wallet is busy, try again later".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
