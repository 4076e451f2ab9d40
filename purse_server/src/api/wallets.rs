//! Wallet API handlers.
//!
//! Read endpoints for wallets and the single mutating endpoint, which applies
//! a DEPOSIT or WITHDRAW through the balance operation engine.
//!
//! # Examples
//!
//! Deposit into a wallet:
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/wallets/<uuid>/operation/ \
//!   -H "Content-Type: application/json" \
//!   -d '{"operation_type": "DEPOSIT", "amount": "12.34"}'
//! ```

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use chrono::{DateTime, Utc};
use purse::user::UserId;
use purse::wallet::{OperationKind, Wallet, WalletError, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::AppState;
use super::errors::{ApiError, ApiResult};
use super::request_id::RequestId;
use crate::{logging, metrics};

/// Amounts must stay below this to fit `NUMERIC(10, 2)`
const AMOUNT_LIMIT: i64 = 100_000_000;

#[derive(Debug, Serialize)]
pub struct WalletListItem {
    pub wallet_id: WalletId,
    pub user: UserId,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WalletInfoResponse {
    pub wallet_id: WalletId,
    pub user: UserId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletListItem {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet_id: wallet.wallet_id,
            user: wallet.user_id,
            balance: wallet.balance,
        }
    }
}

impl From<Wallet> for WalletInfoResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet_id: wallet.wallet_id,
            user: wallet.user_id,
            balance: wallet.balance,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

/// Amount as sent by clients: a decimal string or a JSON number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Deserialize)]
pub struct OperationPayload {
    pub operation_type: String,
    pub amount: AmountInput,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub message: String,
    pub new_balance: Decimal,
}

/// Parse and validate a client-supplied amount.
///
/// Accepts at most two decimal places after trailing zeros are dropped, so
/// `"10.500"` is accepted as 10.50 while `"10.005"` is rejected.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` if the amount is not a number, is not
/// positive, has more than two decimal places or does not fit a balance.
pub fn parse_amount(input: &AmountInput) -> ApiResult<Decimal> {
    let raw = match input {
        AmountInput::Text(text) => text.trim().to_string(),
        AmountInput::Number(number) => number.to_string(),
    };

    let amount = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| ApiError::BadRequest(format!("A valid number is required, got '{raw}'")))?
        .normalize();

    if amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if amount.scale() > 2 {
        return Err(ApiError::BadRequest(
            "Amount must have no more than 2 decimal places".to_string(),
        ));
    }
    if amount >= Decimal::from(AMOUNT_LIMIT) {
        return Err(ApiError::BadRequest(
            "Amount must have no more than 8 digits before the decimal point".to_string(),
        ));
    }

    Ok(amount)
}

/// Metric/log label for an engine outcome
fn outcome_label(result: &Result<Wallet, WalletError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(WalletError::WalletNotFound(_)) => "not_found",
        Err(WalletError::InsufficientFunds { .. }) => "insufficient_funds",
        Err(WalletError::BalanceOverflow { .. }) => "overflow",
        Err(WalletError::LockTimeout(_)) => "lock_timeout",
        Err(_) => "error",
    }
}

/// List all wallets.
///
/// # Response
///
/// Returns `200 OK` with `[{"wallet_id", "user", "balance"}]`.
pub async fn list_wallets(State(state): State<AppState>) -> ApiResult<Json<Vec<WalletListItem>>> {
    let wallets = state.wallet_manager.list_wallets().await?;
    Ok(Json(wallets.into_iter().map(Into::into).collect()))
}

/// Get the balance of one wallet.
///
/// # Errors
///
/// - `400 Bad Request`: `wallet_id` is not a UUID
/// - `404 Not Found`: Wallet doesn't exist
pub async fn get_balance(
    State(state): State<AppState>,
    wallet_id: Result<Path<WalletId>, PathRejection>,
) -> ApiResult<Json<BalanceResponse>> {
    let Path(wallet_id) = wallet_id?;
    let wallet = state.wallet_manager.get_wallet(wallet_id).await?;
    Ok(Json(BalanceResponse {
        balance: wallet.balance,
    }))
}

/// Get the full record of one wallet.
///
/// # Errors
///
/// - `400 Bad Request`: `wallet_id` is not a UUID
/// - `404 Not Found`: Wallet doesn't exist
pub async fn get_wallet_info(
    State(state): State<AppState>,
    wallet_id: Result<Path<WalletId>, PathRejection>,
) -> ApiResult<Json<WalletInfoResponse>> {
    let Path(wallet_id) = wallet_id?;
    let wallet = state.wallet_manager.get_wallet(wallet_id).await?;
    Ok(Json(wallet.into()))
}

/// Apply a DEPOSIT or WITHDRAW to a wallet.
///
/// # Request Body
///
/// ```json
/// { "operation_type": "WITHDRAW", "amount": "50.00" }
/// ```
///
/// # Response
///
/// Returns `200 OK` with `{"message", "new_balance"}`.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, unknown operation type, invalid amount,
///   insufficient funds or balance overflow
/// - `404 Not Found`: Wallet doesn't exist
/// - `503 Service Unavailable`: Wallet stayed locked by other operations
pub async fn perform_operation(
    State(state): State<AppState>,
    request_id: RequestId,
    wallet_id: Result<Path<WalletId>, PathRejection>,
    payload: Result<Json<OperationPayload>, JsonRejection>,
) -> ApiResult<Json<OperationResponse>> {
    let Path(wallet_id) = wallet_id?;
    let Json(payload) = payload?;

    let kind = OperationKind::from_str(&payload.operation_type)?;
    let amount = parse_amount(&payload.amount)?;

    let result = state.wallet_manager.apply(wallet_id, kind, amount).await;

    let outcome = outcome_label(&result);
    metrics::wallet_operations_total(&kind.to_string(), outcome);
    if matches!(result, Err(WalletError::LockTimeout(_))) {
        metrics::wallet_lock_timeouts_total();
    }
    logging::log_wallet_operation(&kind.to_string(), &wallet_id.to_string(), outcome);
    if outcome == "error" {
        tracing::warn!(request_id = request_id.as_str(), "Wallet operation failed");
    }

    let wallet = result?;
    Ok(Json(OperationResponse {
        message: "Operation completed successfully".to_string(),
        new_balance: wallet.balance,
    }))
}
