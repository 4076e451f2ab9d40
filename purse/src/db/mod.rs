//! Database module providing PostgreSQL connection pooling and the storage boundary.
//!
//! The wallet engine and the user workflow only talk to storage through the
//! [`Store`] and [`StoreTransaction`] traits. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps everything in process with the same
//! row-locking contract and is used by tests and local demos.

use sqlx::postgres::PgPool;

pub mod config;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Store, StoreTransaction};
pub use timeouts::{DEFAULT_LOCK_TIMEOUT, DEFAULT_QUERY_TIMEOUT, TimeoutError, with_timeout};

/// Idempotent DDL for the `users` and `wallets` tables.
pub const SCHEMA: &str = include_str!("../../schema/wallets.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use purse::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::development()).await?;
    ///     db.ensure_schema().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = config
            .pool_options()
            .connect(&config.database_url)
            .await?;
        log::info!(
            "Connected to {} (pool {}..={})",
            config.redacted_url(),
            config.min_connections,
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `users` and `wallets` tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Run a trivial query to confirm the pool can reach the server
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Build a [`PgStore`] sharing this pool.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    /// Drain and close the pool; in-flight transactions finish first.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
