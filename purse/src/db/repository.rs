//! Storage traits consumed by the wallet engine and the user workflow.
//!
//! A [`Store`] hands out [`StoreTransaction`]s. Everything done through a
//! transaction becomes visible to other callers only after
//! [`StoreTransaction::commit`]; dropping a transaction without committing
//! rolls it back and releases every row lock it holds.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

use super::errors::StoreResult;
use crate::user::{NewUser, User, UserId};
use crate::wallet::{Wallet, WalletId};

/// Shared handle to wallet and user storage
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Read the committed state of a wallet without taking its row lock
    async fn get_wallet(&self, wallet_id: WalletId) -> StoreResult<Option<Wallet>>;

    /// List all wallets, oldest first
    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>>;

    /// Find user by ID
    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// List all users ordered by ID
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Overwrite the mutable fields of an existing user; `None` if it does not exist
    async fn save_user(&self, user: &User) -> StoreResult<Option<User>>;

    /// Delete a user together with its wallet; `false` if it did not exist
    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool>;

    /// Cheap round trip used by health checks
    async fn ping(&self) -> StoreResult<()>;
}

/// A unit of work against a [`Store`]
#[async_trait]
pub trait StoreTransaction: Send {
    /// Take the exclusive row lock on a wallet, then read its latest committed state.
    ///
    /// Blocks while another transaction holds the lock, for at most
    /// `lock_timeout`; past that the wait is cancelled on the storage side and
    /// [`StoreError::LockTimeout`](super::StoreError::LockTimeout) is returned.
    /// Returns `None` without locking anything if the wallet does not exist.
    async fn get_wallet_for_update(
        &mut self,
        wallet_id: WalletId,
        lock_timeout: Duration,
    ) -> StoreResult<Option<Wallet>>;

    /// Persist a new balance for a wallet locked (or inserted) by this transaction
    async fn save_wallet(&mut self, wallet_id: WalletId, balance: Decimal) -> StoreResult<Wallet>;

    /// Insert a user and return it with its assigned ID
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;

    /// Insert a wallet
    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<Wallet>;

    /// Make every change durable and release row locks
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every change and release row locks
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
