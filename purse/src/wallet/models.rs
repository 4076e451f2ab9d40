//! Wallet data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::errors::WalletError;
use crate::user::UserId;

/// Wallet ID type
pub type WalletId = Uuid;

/// Number of fractional digits stored for every balance
pub const BALANCE_SCALE: u32 = 2;

/// Largest balance a `NUMERIC(10, 2)` column can hold: 99 999 999.99
pub fn max_balance() -> Decimal {
    Decimal::new(9_999_999_999, BALANCE_SCALE)
}

/// Round `value` to cents and pin its scale so it always renders as `0.00`.
pub fn to_balance_scale(value: Decimal) -> Decimal {
    let mut scaled = value.round_dp(BALANCE_SCALE);
    scaled.rescale(BALANCE_SCALE);
    scaled
}

/// Wallet model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: WalletId,
    pub user_id: UserId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Build a fresh wallet for `owner` with a random ID.
    pub fn new(owner: UserId, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            wallet_id: Uuid::new_v4(),
            user_id: owner,
            balance: to_balance_scale(balance),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Balance mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Deposit => write!(f, "DEPOSIT"),
            OperationKind::Withdraw => write!(f, "WITHDRAW"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" => Ok(OperationKind::Withdraw),
            other => Err(WalletError::InvalidOperation(other.to_string())),
        }
    }
}
