//! Prometheus metrics for monitoring the wallet server.
//!
//! Metrics are recorded through the `metrics` facade and exposed in Prometheus
//! text format when an exporter is installed with [`init_metrics`]. Without an
//! exporter every recording call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use purse_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/wallets/{id}/operation/", 200);
//! metrics::wallet_operations_total("DEPOSIT", "ok");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Errors
///
/// Returns an error message if the exporter cannot be installed
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template, not the raw URI, to keep
/// label cardinality bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Wallet Metrics
// ============================================================================

/// Increment the wallet operation counter.
pub fn wallet_operations_total(kind: &str, outcome: &str) {
    metrics::counter!("wallet_operations_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment lock timeout counter.
pub fn wallet_lock_timeouts_total() {
    metrics::counter!("wallet_lock_timeouts_total").increment(1);
}
