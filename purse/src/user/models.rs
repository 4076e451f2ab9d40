//! User data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::wallet::Wallet;

/// User ID type
pub type UserId = i64;

/// User model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User creation (or full replacement) request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Partial user update. `last_name: Some(None)` clears the last name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
}

// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<NewUser> for UserChanges {
    fn from(user: NewUser) -> Self {
        Self {
            email: Some(user.email),
            first_name: Some(user.first_name),
            last_name: Some(user.last_name),
        }
    }
}

/// A freshly created user together with the wallet provisioned for it
#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub wallet: Wallet,
}
