//! Structured logging configuration.
//!
//! The `purse` library logs through the `log` facade; the subscriber installed
//! here picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Requests slower than this are logged at warn level
pub const SLOW_REQUEST_MS: u64 = 1000;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use purse_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of a wallet operation request
///
/// # Arguments
///
/// * `operation` - Operation type as sent by the client
/// * `wallet_id` - Target wallet
/// * `outcome` - Short outcome label (`ok`, `insufficient_funds`, ...)
pub fn log_wallet_operation(operation: &str, wallet_id: &str, outcome: &str) {
    if outcome == "ok" {
        tracing::debug!(
            operation = operation,
            wallet_id = wallet_id,
            outcome = outcome,
            "Wallet operation applied"
        );
    } else {
        tracing::info!(
            operation = operation,
            wallet_id = wallet_id,
            outcome = outcome,
            "Wallet operation rejected"
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `request_id` - Correlation ID of the request
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if duration_ms > SLOW_REQUEST_MS {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Slow request completed"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Request completed"
        );
    }
}
