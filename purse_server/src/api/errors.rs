//! Mapping of domain errors onto HTTP responses.
//!
//! Every error body has the shape `{"error": "..."}`. Unclassified failures are
//! logged in full and answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use purse::user::UserError;
use purse::wallet::WalletError;
use serde::Serialize;

/// Message returned for every unclassified failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request or rejected business rule (400)
    BadRequest(String),
    /// Referenced resource does not exist (404)
    NotFound(String),
    /// Wallet lock could not be acquired in time (503)
    Busy(String),
    /// Anything else (500); the detail is logged, never returned
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Busy(msg) => msg,
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Unhandled error while serving request");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Store(ref e) => ApiError::Internal(e.to_string()),
            WalletError::WalletNotFound(_) | WalletError::OwnerNotFound(_) => {
                ApiError::NotFound(err.client_message())
            }
            WalletError::InvalidOperation(_)
            | WalletError::InsufficientFunds { .. }
            | WalletError::InvalidAmount(_)
            | WalletError::BalanceOverflow { .. }
            | WalletError::WalletAlreadyExists(_) => ApiError::BadRequest(err.client_message()),
            WalletError::LockTimeout(_) => ApiError::Busy(err.client_message()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Store(ref e) => ApiError::Internal(e.to_string()),
            UserError::Wallet(e) => e.into(),
            UserError::UserNotFound(_) => ApiError::NotFound(err.client_message()),
            UserError::EmailTaken(_) | UserError::InvalidEmail(_) | UserError::InvalidName(_) => {
                ApiError::BadRequest(err.client_message())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
