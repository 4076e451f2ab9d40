//! In-process [`Store`] with real row locks.
//!
//! Each wallet row carries its own async mutex. A transaction that calls
//! [`StoreTransaction::get_wallet_for_update`] holds that mutex until it commits
//! or is dropped, which gives the same serialization guarantees as
//! `SELECT ... FOR UPDATE` in PostgreSQL. Plain reads never wait on row locks
//! and only see committed data.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    errors::{StoreError, StoreResult},
    repository::{Store, StoreTransaction},
};
use crate::user::{NewUser, User, UserId};
use crate::wallet::{Wallet, WalletId};

const USERS_EMAIL_KEY: &str = "users_email_key";
const WALLETS_PKEY: &str = "wallets_pkey";
const WALLETS_USER_ID_KEY: &str = "wallets_user_id_key";
const WALLETS_USER_ID_FKEY: &str = "wallets_user_id_fkey";
const WALLETS_BALANCE_CHECK: &str = "wallets_balance_non_negative";

struct WalletRow {
    wallet: Wallet,
    lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    wallets: HashMap<WalletId, WalletRow>,
    last_user_id: UserId,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn owner_has_wallet(&self, owner: UserId) -> bool {
        self.wallets.values().any(|row| row.wallet.user_id == owner)
    }
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            locks: HashMap::new(),
            wallet_writes: HashMap::new(),
            new_users: Vec::new(),
            new_wallets: Vec::new(),
        }))
    }

    async fn get_wallet(&self, wallet_id: WalletId) -> StoreResult<Option<Wallet>> {
        Ok(self.read().wallets.get(&wallet_id).map(|row| row.wallet.clone()))
    }

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>> {
        let mut wallets: Vec<Wallet> = self
            .read()
            .wallets
            .values()
            .map(|row| row.wallet.clone())
            .collect();
        wallets.sort_by_key(|w| (w.created_at, w.wallet_id));
        Ok(wallets)
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read().users.get(&user_id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read().users.values().cloned().collect())
    }

    async fn save_user(&self, user: &User) -> StoreResult<Option<User>> {
        let mut tables = self.write();
        if !tables.users.contains_key(&user.id) {
            return Ok(None);
        }
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
        }

        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(None);
        };
        stored.email = user.email.clone();
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.write();
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        tables.wallets.retain(|_, row| row.wallet.user_id != user_id);
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Transaction over a [`MemoryStore`]; writes are buffered until commit.
pub struct MemoryTransaction {
    store: MemoryStore,
    locks: HashMap<WalletId, OwnedMutexGuard<()>>,
    wallet_writes: HashMap<WalletId, Wallet>,
    new_users: Vec<User>,
    new_wallets: Vec<Wallet>,
}

impl MemoryTransaction {
    fn pending_wallet(&mut self, wallet_id: WalletId) -> Option<&mut Wallet> {
        self.new_wallets
            .iter_mut()
            .find(|w| w.wallet_id == wallet_id)
    }

    /// Checks every pending insert against committed data. Runs under the
    /// write lock at commit, since a concurrent transaction may have committed
    /// a conflicting row after our insert.
    fn check_constraints(&self, tables: &Tables) -> StoreResult<()> {
        for user in &self.new_users {
            if tables.email_taken(&user.email, None) {
                return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
            }
        }
        for wallet in &self.new_wallets {
            if tables.wallets.contains_key(&wallet.wallet_id) {
                return Err(StoreError::UniqueViolation(WALLETS_PKEY.to_string()));
            }
            if tables.owner_has_wallet(wallet.user_id) {
                return Err(StoreError::UniqueViolation(WALLETS_USER_ID_KEY.to_string()));
            }
            let owner_pending = self.new_users.iter().any(|u| u.id == wallet.user_id);
            if !owner_pending && !tables.users.contains_key(&wallet.user_id) {
                return Err(StoreError::ForeignKeyViolation(WALLETS_USER_ID_FKEY.to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_wallet_for_update(
        &mut self,
        wallet_id: WalletId,
        lock_timeout: Duration,
    ) -> StoreResult<Option<Wallet>> {
        if let Some(pending) = self.pending_wallet(wallet_id) {
            return Ok(Some(pending.clone()));
        }
        if self.locks.contains_key(&wallet_id) {
            if let Some(written) = self.wallet_writes.get(&wallet_id) {
                return Ok(Some(written.clone()));
            }
            return self.store.get_wallet(wallet_id).await;
        }

        let lock = match self.store.read().wallets.get(&wallet_id) {
            Some(row) => row.lock.clone(),
            None => return Ok(None),
        };
        let guard = tokio::time::timeout(lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        // Re-read after acquiring: the previous holder may have committed a new
        // balance or deleted the row while we waited.
        let current = self.store.get_wallet(wallet_id).await?;
        if current.is_some() {
            self.locks.insert(wallet_id, guard);
        }
        Ok(current)
    }

    async fn save_wallet(&mut self, wallet_id: WalletId, balance: Decimal) -> StoreResult<Wallet> {
        if balance < Decimal::ZERO {
            return Err(StoreError::CheckViolation(WALLETS_BALANCE_CHECK.to_string()));
        }
        let now = Utc::now();

        if let Some(pending) = self.pending_wallet(wallet_id) {
            pending.balance = balance;
            pending.updated_at = now;
            return Ok(pending.clone());
        }
        if !self.locks.contains_key(&wallet_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }

        let mut wallet = match self.wallet_writes.get(&wallet_id) {
            Some(written) => written.clone(),
            None => self
                .store
                .get_wallet(wallet_id)
                .await?
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?,
        };
        wallet.balance = balance;
        wallet.updated_at = now;
        self.wallet_writes.insert(wallet_id, wallet.clone());
        Ok(wallet)
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let id = {
            let mut tables = self.store.write();
            if tables.email_taken(&user.email, None) {
                return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
            }
            // IDs are consumed even if the transaction rolls back, like a sequence.
            tables.last_user_id += 1;
            tables.last_user_id
        };
        if self.new_users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
        }

        let now = Utc::now();
        let created = User {
            id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: now,
            updated_at: now,
        };
        self.new_users.push(created.clone());
        Ok(created)
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<Wallet> {
        if self.new_wallets.iter().any(|w| w.user_id == wallet.user_id) {
            return Err(StoreError::UniqueViolation(WALLETS_USER_ID_KEY.to_string()));
        }
        if self.new_wallets.iter().any(|w| w.wallet_id == wallet.wallet_id) {
            return Err(StoreError::UniqueViolation(WALLETS_PKEY.to_string()));
        }
        if wallet.balance < Decimal::ZERO {
            return Err(StoreError::CheckViolation(WALLETS_BALANCE_CHECK.to_string()));
        }

        self.new_wallets.push(wallet.clone());
        let checked = {
            let tables = self.store.read();
            self.check_constraints(&tables)
        };
        if let Err(e) = checked {
            self.new_wallets.pop();
            return Err(e);
        }
        Ok(wallet.clone())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut tables = this.store.write();
        this.check_constraints(&tables)?;

        for user in this.new_users {
            tables.users.insert(user.id, user);
        }
        for wallet in this.new_wallets {
            tables.wallets.insert(
                wallet.wallet_id,
                WalletRow {
                    wallet,
                    lock: Arc::new(Mutex::new(())),
                },
            );
        }
        for (wallet_id, wallet) in this.wallet_writes {
            if let Some(row) = tables.wallets.get_mut(&wallet_id) {
                row.wallet = wallet;
            }
        }
        drop(tables);
        // Row locks release here, after the new balances are visible.
        drop(this.locks);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
