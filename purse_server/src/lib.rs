//! HTTP request boundary for purse wallets.
//!
//! Exposes the wallet and user REST API, server configuration, structured
//! logging and Prometheus metrics. The binary in `main.rs` wires these
//! together against PostgreSQL.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
