//! Connection pool settings for the wallet database.

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Upper bound on pooled connections. Every in-flight wallet operation
    /// holds one for the length of its transaction.
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// Seconds to wait for a free pooled connection
    pub connection_timeout_secs: u64,

    /// Seconds before an idle connection is closed
    pub idle_timeout_secs: u64,

    /// Seconds before any connection is recycled
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Local development defaults against `postgres://postgres@localhost/purse`.
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/purse".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Pool builder carrying these limits
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
    }

    /// The connection URL with any password replaced by `***`, for logs.
    pub fn redacted_url(&self) -> String {
        let url = &self.database_url;
        let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
            return url.clone();
        };
        let rest = &url[scheme_end..];
        let Some(at) = rest.rfind('@') else {
            return url.clone();
        };
        let credentials = &rest[..at];
        match credentials.find(':') {
            Some(colon) => format!(
                "{}{}:***{}",
                &url[..scheme_end],
                &credentials[..colon],
                &rest[at..]
            ),
            None => url.clone(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
