//! Wallet REST server.
//!
//! Serves the purse wallet and user API over HTTP, backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use purse::db::Database;
use purse_server::{
    api,
    config::{CliOverrides, ServerConfig},
    logging, metrics,
};

const HELP: &str = "\
Run the purse wallet server

USAGE:
  purse_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url        URL      Database connection string  [default: env DATABASE_URL]
  --metrics-bind  IP:PORT  Prometheus exporter address [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8000)
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size upper bound
  WALLET_LOCK_TIMEOUT_MS   Wait limit for a wallet row lock [default: 5000]
  METRICS_BIND             Prometheus exporter address
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        metrics_bind: pargs.opt_value_from_str::<_, SocketAddr>("--metrics-bind")?,
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{addr}/metrics");
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.ensure_schema()
        .await
        .context("Failed to apply database schema")?;
    info!("Database connected and schema ready");

    let state = api::AppState::new(Arc::new(db.store()), config.lock_timeout);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
