//! Shared setup for integration tests.

#![allow(dead_code)]

use purse::db::{MemoryStore, Store};
use purse::user::{NewUser, UserManager};
use purse::wallet::{Wallet, WalletManager};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_EMAIL: AtomicUsize = AtomicUsize::new(0);

/// Generate an email no other test in this binary uses
pub fn unique_email(prefix: &str) -> String {
    let n = NEXT_EMAIL.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{n}_{}@example.com", uuid::Uuid::new_v4().simple())
}

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: Some("User".to_string()),
    }
}

/// Wallet and user managers over one store
pub struct Harness {
    pub store: Arc<dyn Store>,
    pub wallets: Arc<WalletManager>,
    pub users: UserManager,
}

impl Harness {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let wallets = Arc::new(WalletManager::new(store.clone()));
        let users = UserManager::new(store.clone(), wallets.clone());
        Self {
            store,
            wallets,
            users,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Create a user and fund its wallet with `balance`
    pub async fn funded_wallet(&self, balance: Decimal) -> Wallet {
        let created = self
            .users
            .create_user(new_user(&unique_email("funded")))
            .await
            .expect("user creation should succeed");
        if balance > Decimal::ZERO {
            self.wallets
                .deposit(created.wallet.wallet_id, balance)
                .await
                .expect("funding deposit should succeed")
        } else {
            created.wallet
        }
    }
}
