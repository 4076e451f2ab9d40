//! User API handlers.
//!
//! Creating a user also provisions its wallet in the same transaction, so the
//! creation response carries the new `wallet_id`.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use purse::user::{NewUser, User, UserChanges, UserId};
use purse::wallet::WalletId;
use serde::Serialize;

use super::AppState;
use super::errors::ApiResult;

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub wallet_id: WalletId,
}

/// List all users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.user_manager.list_users().await?))
}

/// Create a user and its wallet.
///
/// # Request Body
///
/// ```json
/// { "email": "ada@example.com", "first_name": "Ada", "last_name": null }
/// ```
///
/// # Response
///
/// Returns `201 Created` with the user record plus `wallet_id`.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, invalid fields or email already registered
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedUserResponse>)> {
    let Json(request) = payload?;
    let created = state.user_manager.create_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            user: created.user,
            wallet_id: created.wallet.wallet_id,
        }),
    ))
}

/// Get one user.
///
/// # Errors
///
/// - `404 Not Found`: User doesn't exist
pub async fn get_user(
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(user_id) = user_id?;
    Ok(Json(state.user_manager.get_user(user_id).await?))
}

/// Replace a user's editable fields (PUT).
pub async fn replace_user(
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Path(user_id) = user_id?;
    let Json(request) = payload?;
    Ok(Json(state.user_manager.replace_user(user_id, request).await?))
}

/// Update some of a user's fields (PATCH).
pub async fn update_user(
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Path(user_id) = user_id?;
    let Json(changes) = payload?;
    Ok(Json(state.user_manager.update_user(user_id, changes).await?))
}

/// Delete a user and its wallet.
///
/// Returns `204 No Content`.
pub async fn delete_user(
    State(state): State<AppState>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(user_id) = user_id?;
    state.user_manager.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
