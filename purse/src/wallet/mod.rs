//! Wallet module: the wallet model and the balance operation engine.
//!
//! Wallets are mutated only through [`WalletManager::perform_operation`]
//! (or its typed forms [`WalletManager::apply`], [`WalletManager::deposit`] and
//! [`WalletManager::withdraw`]). Each call:
//! - Locks the wallet row for the lifetime of one transaction
//! - Rejects withdrawals larger than the balance, rolling back
//! - Persists and returns the new balance on success
//!
//! ## Example
//!
//! ```no_run
//! use purse::db::{Database, DatabaseConfig};
//! use purse::wallet::WalletManager;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::development()).await?;
//!     let wallets = WalletManager::new(Arc::new(db.store()));
//!
//!     let wallet_id = "6a2f41a3-c54c-fce8-32d2-0324e1c32e22".parse()?;
//!     let wallet = wallets
//!         .perform_operation(wallet_id, "WITHDRAW", Decimal::new(1250, 2))
//!         .await?;
//!     println!("New balance: {}", wallet.balance);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{BALANCE_SCALE, OperationKind, Wallet, WalletId, max_balance, to_balance_scale};
