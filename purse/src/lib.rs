//! # Purse
//!
//! Per-user wallets with a single piece of real business logic: an atomic
//! deposit/withdraw operation on a wallet balance.
//!
//! Every balance mutation runs inside a storage transaction that holds an
//! exclusive lock on the wallet row for the whole read-validate-write
//! sequence. Concurrent operations on the same wallet are serialized in lock
//! acquisition order; operations on different wallets never contend.
//!
//! ## Core Modules
//!
//! - [`wallet`]: Wallet model and the balance operation engine ([`WalletManager`])
//! - [`user`]: User lifecycle, including wallet provisioning on creation
//! - [`db`]: Storage boundary, PostgreSQL and in-memory stores, connection pooling
//!
//! ## Example
//!
//! ```
//! use purse::{db::MemoryStore, user::{NewUser, UserManager}, wallet::WalletManager};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let wallets = Arc::new(WalletManager::new(store.clone()));
//! let users = UserManager::new(store, wallets.clone());
//!
//! let created = users
//!     .create_user(NewUser {
//!         email: "ada@example.com".to_string(),
//!         first_name: "Ada".to_string(),
//!         last_name: None,
//!     })
//!     .await?;
//!
//! let wallet = wallets
//!     .perform_operation(created.wallet.wallet_id, "DEPOSIT", Decimal::new(5000, 2))
//!     .await?;
//! assert_eq!(wallet.balance, Decimal::new(5000, 2));
//! # Ok(())
//! # }
//! ```

/// Storage boundary and database plumbing.
pub mod db;

/// Users and the wallet provisioning step of user creation.
pub mod user;

/// Wallets and the balance operation engine.
pub mod wallet;

pub use user::{User, UserManager};
pub use wallet::{OperationKind, Wallet, WalletError, WalletManager};
