//! HTTP API for the wallet server.
//!
//! # Modules
//!
//! - [`wallets`]: Wallet listing, balance lookup and the DEPOSIT/WITHDRAW operation
//! - [`users`]: User CRUD; creating a user provisions its wallet
//! - [`errors`]: Mapping of domain errors onto status codes and `{"error": ...}` bodies
//! - [`request_id`]: Request correlation, request logging and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                 - Health check
//! GET    /api/v1/wallets/                        - List wallets
//! GET    /api/v1/wallets/{wallet_id}/            - Wallet balance
//! GET    /api/v1/wallets/{wallet_id}/info/       - Full wallet record
//! POST   /api/v1/wallets/{wallet_id}/operation/  - DEPOSIT or WITHDRAW
//! GET    /api/v1/users/                          - List users
//! POST   /api/v1/users/                          - Create user (and wallet)
//! GET    /api/v1/users/{user_id}/                - Get user
//! PUT    /api/v1/users/{user_id}/                - Replace user
//! PATCH  /api/v1/users/{user_id}/                - Update user
//! DELETE /api/v1/users/{user_id}/                - Delete user (and wallet)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use purse::db::MemoryStore;
//! use purse_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(Arc::new(MemoryStore::new()), purse::db::DEFAULT_LOCK_TIMEOUT);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod errors;
pub mod request_id;
pub mod users;
pub mod wallets;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use purse::db::{DEFAULT_QUERY_TIMEOUT, Store, with_timeout};
use purse::user::UserManager;
use purse::wallet::WalletManager;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub wallet_manager: Arc<WalletManager>,
    pub user_manager: Arc<UserManager>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Build managers over `store` with the given wallet lock timeout
    pub fn new(store: Arc<dyn Store>, lock_timeout: Duration) -> Self {
        let wallet_manager =
            Arc::new(WalletManager::new(store.clone()).with_lock_timeout(lock_timeout));
        let user_manager = Arc::new(UserManager::new(store.clone(), wallet_manager.clone()));
        Self {
            wallet_manager,
            user_manager,
            store,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with managers
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let wallet_routes = Router::new()
        .route("/wallets/", get(wallets::list_wallets))
        .route("/wallets/{wallet_id}/", get(wallets::get_balance))
        .route("/wallets/{wallet_id}/info/", get(wallets::get_wallet_info))
        .route(
            "/wallets/{wallet_id}/operation/",
            post(wallets::perform_operation),
        );

    let user_routes = Router::new()
        .route("/users/", get(users::list_users).post(users::create_user))
        .route(
            "/users/{user_id}/",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        );

    Router::new().merge(wallet_routes).merge(user_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if storage answers within the query timeout, or
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8000/health
/// # {"status":"healthy","version":"0.1.0","database":true,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match with_timeout(DEFAULT_QUERY_TIMEOUT, state.store.ping()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
