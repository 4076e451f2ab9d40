//! Bounded waits for storage operations.
//!
//! Row locks are held until the owning transaction finishes, so a caller
//! queued behind a slow transaction would otherwise wait forever.

use std::time::Duration;
use tokio::time::timeout;

use super::errors::StoreError;

/// Default bound on waiting for a wallet row lock (5 seconds)
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for plain queries such as health checks (2 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a storage future, giving up after `duration`.
///
/// This only abandons the future on the client side. Row-lock waits are
/// bounded inside the store by the `lock_timeout` passed to
/// [`StoreTransaction::get_wallet_for_update`](super::StoreTransaction::get_wallet_for_update);
/// use this as a backstop for a backend that stops answering.
///
/// # Example
///
/// ```no_run
/// use purse::db::{Store, timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT}};
/// # async fn example(store: &dyn Store) -> Result<(), Box<dyn std::error::Error>> {
/// with_timeout(DEFAULT_QUERY_TIMEOUT, store.ping()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Store(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}
