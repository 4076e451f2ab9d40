//! User lifecycle.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::{
    errors::{UserError, UserResult},
    models::{CreatedUser, NewUser, User, UserChanges, UserId},
};
use crate::db::{Store, StoreError};
use crate::wallet::WalletManager;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 100;

/// User manager
#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn Store>,
    wallets: Arc<WalletManager>,
}

impl UserManager {
    /// Create a new user manager
    ///
    /// # Arguments
    ///
    /// * `store` - User and wallet storage
    /// * `wallets` - Wallet manager used to provision each new user's wallet
    pub fn new(store: Arc<dyn Store>, wallets: Arc<WalletManager>) -> Self {
        Self { store, wallets }
    }

    /// Create a user and its wallet
    ///
    /// The user row and the wallet row are written in one transaction: either
    /// both exist afterwards or neither does.
    ///
    /// # Errors
    ///
    /// * `UserError::InvalidEmail` / `UserError::InvalidName` - Malformed input
    /// * `UserError::EmailTaken` - Email already registered
    pub async fn create_user(&self, request: NewUser) -> UserResult<CreatedUser> {
        let request = validate(request)?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .insert_user(&request)
            .await
            .map_err(|e| write_error(e, &request.email))?;
        let wallet = self
            .wallets
            .provision_wallet(tx.as_mut(), user.id, Decimal::ZERO)
            .await?;
        tx.commit()
            .await
            .map_err(|e| write_error(e, &request.email))?;

        log::info!("Created user {} ({})", user.id, user.email);
        Ok(CreatedUser { user, wallet })
    }

    /// List every user
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    /// Find user by ID
    pub async fn get_user(&self, user_id: UserId) -> UserResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(UserError::UserNotFound(user_id))
    }

    /// Replace every editable field of a user
    pub async fn replace_user(&self, user_id: UserId, request: NewUser) -> UserResult<User> {
        self.update_user(user_id, request.into()).await
    }

    /// Apply a partial update to a user
    pub async fn update_user(&self, user_id: UserId, changes: UserChanges) -> UserResult<User> {
        let mut user = self.get_user(user_id).await?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }

        let validated = validate(NewUser {
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })?;
        user.email = validated.email;
        user.first_name = validated.first_name;
        user.last_name = validated.last_name;

        self.store
            .save_user(&user)
            .await
            .map_err(|e| write_error(e, &user.email))?
            .ok_or(UserError::UserNotFound(user_id))
    }

    /// Delete a user; its wallet goes with it
    pub async fn delete_user(&self, user_id: UserId) -> UserResult<()> {
        if !self.store.delete_user(user_id).await? {
            return Err(UserError::UserNotFound(user_id));
        }
        log::info!("Deleted user {user_id} and its wallet");
        Ok(())
    }
}

fn write_error(err: StoreError, email: &str) -> UserError {
    match err {
        StoreError::UniqueViolation(constraint) if constraint == "users_email_key" => {
            UserError::EmailTaken(email.to_string())
        }
        other => UserError::Store(other),
    }
}

/// Trim fields and check lengths and email shape.
fn validate(request: NewUser) -> UserResult<NewUser> {
    let email = request.email.trim().to_string();
    if email.len() > MAX_EMAIL_LEN || !is_plausible_email(&email) {
        return Err(UserError::InvalidEmail(email));
    }

    let first_name = request.first_name.trim().to_string();
    if first_name.is_empty() || first_name.chars().count() > MAX_NAME_LEN {
        return Err(UserError::InvalidName(format!(
            "first name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }

    let last_name = request
        .last_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    if last_name
        .as_ref()
        .is_some_and(|name| name.chars().count() > MAX_NAME_LEN)
    {
        return Err(UserError::InvalidName(format!(
            "last name must be at most {MAX_NAME_LEN} characters"
        )));
    }

    Ok(NewUser {
        email,
        first_name,
        last_name,
    })
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
