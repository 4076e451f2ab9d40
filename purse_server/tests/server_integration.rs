//! Integration tests for the HTTP API.
//!
//! Routers are built over an in-memory store and driven with `oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use purse::db::{DEFAULT_LOCK_TIMEOUT, MemoryStore};
use purse_server::api::{AppState, create_router};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt; // For `oneshot` method

static NEXT_EMAIL: AtomicUsize = AtomicUsize::new(0);

fn create_test_server() -> (axum::Router, AppState) {
    let state = AppState::new(Arc::new(MemoryStore::new()), DEFAULT_LOCK_TIMEOUT);
    (create_router(state.clone()), state)
}

fn unique_email() -> String {
    format!("user{}@example.com", NEXT_EMAIL.fetch_add(1, Ordering::Relaxed))
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Create a user through the API and fund its wallet directly
async fn funded_wallet(app: &axum::Router, state: &AppState, balance: Decimal) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users/",
        Some(json!({"email": unique_email(), "first_name": "Test"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let wallet_id = body["wallet_id"].as_str().unwrap().to_string();
    if balance > Decimal::ZERO {
        state
            .wallet_manager
            .deposit(uuid::Uuid::parse_str(&wallet_id).unwrap(), balance)
            .await
            .unwrap();
    }
    wallet_id
}

fn operation_uri(wallet_id: &str) -> String {
    format!("/api/v1/wallets/{wallet_id}/operation/")
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal encoded as string")).unwrap()
}

// ============================================================================
// Health and middleware
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let (app, _) = create_test_server();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/wallets/not-a-uuid/")
                .header("x-request-id", "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

// ============================================================================
// Wallet endpoints
// ============================================================================

#[tokio::test]
async fn test_list_and_read_wallets() {
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(100.00)).await;

    let (status, body) = send(&app, "GET", "/api/v1/wallets/", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["wallet_id"], wallet_id.as_str());
    assert!(list[0]["user"].is_i64());

    let (status, body) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "100.00");

    let (status, body) =
        send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/info/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wallet_id"], wallet_id.as_str());
    assert!(body["created_at"].is_string());
    assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn test_wallet_lookup_errors() {
    let (app, _) = create_test_server();

    let (status, body) = send(&app, "GET", "/api/v1/wallets/not-a-uuid/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let unknown = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/api/v1/wallets/{unknown}/info/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Wallet not found");
}

#[tokio::test]
async fn test_deposit_then_withdraw() {
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(100.00)).await;

    let (status, body) = send(
        &app,
        "POST",
        &operation_uri(&wallet_id),
        Some(json!({"operation_type": "DEPOSIT", "amount": "50.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert_eq!(decimal(&body["new_balance"]), dec!(150.00));

    let (status, body) = send(
        &app,
        "POST",
        &operation_uri(&wallet_id),
        Some(json!({"operation_type": "WITHDRAW", "amount": 49.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"], "100.50");
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balance() {
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(100.00)).await;

    let (status, body) = send(
        &app,
        "POST",
        &operation_uri(&wallet_id),
        Some(json!({"operation_type": "WITHDRAW", "amount": "150.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient funds");

    let (_, body) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(body["balance"], "100.00");
}

#[tokio::test]
async fn test_operation_validation_errors() {
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(10.00)).await;
    let uri = operation_uri(&wallet_id);

    let bad_bodies = [
        json!({"operation_type": "INVALID", "amount": "1.00"}),
        json!({"operation_type": "DEPOSIT", "amount": "0"}),
        json!({"operation_type": "DEPOSIT", "amount": "-3.00"}),
        json!({"operation_type": "DEPOSIT", "amount": "1.001"}),
        json!({"operation_type": "DEPOSIT", "amount": "100000000"}),
        json!({"operation_type": "DEPOSIT", "amount": "lots"}),
        json!({"operation_type": "DEPOSIT"}),
        json!({"amount": "1.00"}),
    ];

    for body in bad_bodies {
        let (status, response) = send(&app, "POST", &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {body}");
        assert!(response["error"].is_string());
    }

    let (_, body) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(body["balance"], "10.00");
}

#[tokio::test]
async fn test_operation_on_unknown_wallet() {
    let (app, _) = create_test_server();
    let unknown = uuid::Uuid::new_v4().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &operation_uri(&unknown),
        Some(json!({"operation_type": "DEPOSIT", "amount": "1.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deposit_overflow_is_rejected() {
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(99999999.00)).await;

    let (status, _) = send(
        &app,
        "POST",
        &operation_uri(&wallet_id),
        Some(json!({"operation_type": "DEPOSIT", "amount": "1.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_over_http() {
    const ATTEMPTS: usize = 10;
    let (app, state) = create_test_server();
    let wallet_id = funded_wallet(&app, &state, dec!(40.00)).await;

    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let app = app.clone();
            let uri = operation_uri(&wallet_id);
            tokio::spawn(async move {
                send(
                    &app,
                    "POST",
                    &uri,
                    Some(json!({"operation_type": "WITHDRAW", "amount": "10.00"})),
                )
                .await
                .0
            })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("Unexpected status {other}"),
        }
    }
    assert_eq!(ok, 4);

    let (_, body) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(body["balance"], "0.00");
}

// ============================================================================
// User endpoints
// ============================================================================

#[tokio::test]
async fn test_user_crud_lifecycle() {
    let (app, _) = create_test_server();
    let email = unique_email();

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/users/",
        Some(json!({"email": email, "first_name": "Ada", "last_name": "Lovelace"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = created["id"].as_i64().unwrap();
    let wallet_id = created["wallet_id"].as_str().unwrap().to_string();
    let user_uri = format!("/api/v1/users/{user_id}/");

    let (_, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(wallet["balance"], "0.00");

    let (status, body) = send(&app, "GET", &user_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Ada");

    let (status, body) = send(&app, "PATCH", &user_uri, Some(json!({"last_name": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["last_name"].is_null());
    assert_eq!(body["first_name"], "Ada");

    let (status, body) = send(
        &app,
        "PUT",
        &user_uri,
        Some(json!({"email": unique_email(), "first_name": "Grace"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Grace");

    let (status, body) = send(&app, "GET", "/api/v1/users/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &user_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &user_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/api/v1/wallets/{wallet_id}/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_user_validation() {
    let (app, _) = create_test_server();
    let email = unique_email();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/",
        Some(json!({"email": email, "first_name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let invalid = [
        json!({"email": email, "first_name": "Again"}),
        json!({"email": "not-an-email", "first_name": "Ada"}),
        json!({"email": unique_email(), "first_name": "   "}),
        json!({"first_name": "Ada"}),
    ];
    for body in invalid {
        let (status, response) = send(&app, "POST", "/api/v1/users/", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {body}");
        assert!(response["error"].is_string());
    }

    let (_, wallets) = send(&app, "GET", "/api/v1/wallets/", None).await;
    assert_eq!(wallets.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_user_and_bad_id() {
    let (app, _) = create_test_server();

    let (status, _) = send(&app, "GET", "/api/v1/users/9999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/v1/users/abc/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
