//! Balance operation engine.
//!
//! Every mutation runs as one storage transaction:
//! lock the wallet row, read the balance, validate, write, commit. The row lock
//! is held from the read until the transaction finishes, so two concurrent
//! withdrawals can never both observe the same stale balance.

use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};

use super::{
    errors::{WalletError, WalletResult},
    models::{BALANCE_SCALE, OperationKind, Wallet, WalletId, max_balance, to_balance_scale},
};
use crate::db::{
    Store, StoreError, StoreTransaction,
    timeouts::{DEFAULT_LOCK_TIMEOUT, DEFAULT_QUERY_TIMEOUT, TimeoutError, with_timeout},
};
use crate::user::UserId;

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn Store>,
    lock_timeout: Duration,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `store` - Wallet storage
    ///
    /// # Returns
    ///
    /// * `WalletManager` - Manager waiting at most [`DEFAULT_LOCK_TIMEOUT`] for a row lock
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bound how long an operation may queue behind others on the same wallet.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Get the committed state of a wallet
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletNotFound` - No wallet with this ID
    pub async fn get_wallet(&self, wallet_id: WalletId) -> WalletResult<Wallet> {
        self.store
            .get_wallet(wallet_id)
            .await?
            .ok_or(WalletError::WalletNotFound(wallet_id))
    }

    /// List every wallet
    pub async fn list_wallets(&self) -> WalletResult<Vec<Wallet>> {
        Ok(self.store.list_wallets().await?)
    }

    /// Deposit to or withdraw from a wallet, with the operation kind given as text.
    ///
    /// The kind is parsed before any storage is touched, so an unknown kind
    /// never opens a transaction or takes a lock.
    ///
    /// # Arguments
    ///
    /// * `wallet_id` - Wallet to mutate
    /// * `operation` - `"DEPOSIT"` or `"WITHDRAW"`
    /// * `amount` - Strictly positive amount
    ///
    /// # Returns
    ///
    /// * `WalletResult<Wallet>` - The wallet as persisted after the operation
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidOperation` - Unknown operation kind
    /// * `WalletError::InvalidAmount` - Amount is zero, negative or finer than a cent
    /// * `WalletError::WalletNotFound` - No wallet with this ID
    /// * `WalletError::InsufficientFunds` - Withdrawal exceeds the balance
    /// * `WalletError::BalanceOverflow` - Deposit would exceed the storable maximum
    /// * `WalletError::LockTimeout` - Another operation held the wallet too long
    pub async fn perform_operation(
        &self,
        wallet_id: WalletId,
        operation: &str,
        amount: Decimal,
    ) -> WalletResult<Wallet> {
        let kind: OperationKind = operation.parse()?;
        self.apply(wallet_id, kind, amount).await
    }

    /// Apply one balance operation atomically. See [`WalletManager::perform_operation`].
    pub async fn apply(
        &self,
        wallet_id: WalletId,
        kind: OperationKind,
        amount: Decimal,
    ) -> WalletResult<Wallet> {
        if amount <= Decimal::ZERO || amount.normalize().scale() > BALANCE_SCALE {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut tx = self.store.begin().await?;

        // The store enforces the lock timeout itself; the outer bound only
        // catches a backend that stops answering altogether.
        let backstop = self.lock_timeout + DEFAULT_QUERY_TIMEOUT;
        // Every early return below drops `tx`, which rolls back and releases the lock.
        let wallet = with_timeout(backstop, tx.get_wallet_for_update(wallet_id, self.lock_timeout))
            .await
            .map_err(|e| self.lock_wait_error(e))?
            .ok_or(WalletError::WalletNotFound(wallet_id))?;

        let previous = wallet.balance;
        log::debug!("Locked wallet {wallet_id} for {kind} of {amount}, balance {previous}");

        let new_balance = match kind {
            OperationKind::Deposit => {
                let max = max_balance();
                previous
                    .checked_add(amount)
                    .map(to_balance_scale)
                    .filter(|balance| *balance <= max)
                    .ok_or(WalletError::BalanceOverflow { max })?
            }
            OperationKind::Withdraw => {
                if previous < amount {
                    return Err(WalletError::InsufficientFunds {
                        available: previous,
                        required: amount,
                    });
                }
                to_balance_scale(previous - amount)
            }
        };

        let updated = tx.save_wallet(wallet_id, new_balance).await?;
        tx.commit().await?;

        log::info!(
            "Wallet {} {} {}: balance {} -> {}",
            wallet_id,
            kind,
            amount,
            previous,
            updated.balance
        );

        Ok(updated)
    }

    fn lock_wait_error(&self, err: TimeoutError) -> WalletError {
        match err {
            TimeoutError::Timeout(_) | TimeoutError::Store(StoreError::LockTimeout) => {
                WalletError::LockTimeout(self.lock_timeout)
            }
            TimeoutError::Store(other) => WalletError::Store(other),
        }
    }

    /// Add `amount` to a wallet
    pub async fn deposit(&self, wallet_id: WalletId, amount: Decimal) -> WalletResult<Wallet> {
        self.apply(wallet_id, OperationKind::Deposit, amount).await
    }

    /// Remove `amount` from a wallet if the balance covers it
    pub async fn withdraw(&self, wallet_id: WalletId, amount: Decimal) -> WalletResult<Wallet> {
        self.apply(wallet_id, OperationKind::Withdraw, amount).await
    }

    /// Create a wallet for an existing user in its own transaction.
    ///
    /// Users get their wallet from [`UserManager::create_user`](crate::user::UserManager::create_user);
    /// this entry point exists for seeding and tests that need a specific
    /// starting balance.
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletAlreadyExists` - The user already owns a wallet
    /// * `WalletError::OwnerNotFound` - No such user
    pub async fn create_wallet(&self, owner: UserId, initial_balance: Decimal) -> WalletResult<Wallet> {
        let mut tx = self.store.begin().await?;
        let wallet = self
            .provision_wallet(tx.as_mut(), owner, initial_balance)
            .await?;
        tx.commit()
            .await
            .map_err(|e| insert_wallet_error(e, owner))?;
        Ok(wallet)
    }

    /// Insert the wallet for `owner` inside the caller's transaction.
    ///
    /// The wallet becomes visible when the caller commits.
    pub async fn provision_wallet(
        &self,
        tx: &mut dyn StoreTransaction,
        owner: UserId,
        initial_balance: Decimal,
    ) -> WalletResult<Wallet> {
        if initial_balance < Decimal::ZERO {
            return Err(WalletError::InvalidAmount(initial_balance));
        }
        let max = max_balance();
        if initial_balance > max {
            return Err(WalletError::BalanceOverflow { max });
        }

        let wallet = tx
            .insert_wallet(&Wallet::new(owner, initial_balance))
            .await
            .map_err(|e| insert_wallet_error(e, owner))?;

        log::info!(
            "Provisioned wallet {} for user {} with balance {}",
            wallet.wallet_id,
            owner,
            wallet.balance
        );
        Ok(wallet)
    }
}

fn insert_wallet_error(err: StoreError, owner: UserId) -> WalletError {
    match err {
        StoreError::UniqueViolation(_) => WalletError::WalletAlreadyExists(owner),
        StoreError::ForeignKeyViolation(_) => WalletError::OwnerNotFound(owner),
        other => WalletError::Store(other),
    }
}
