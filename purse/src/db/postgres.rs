//! PostgreSQL implementation of [`Store`].
//!
//! Row locking is delegated to the database: `SELECT ... FOR UPDATE` inside a
//! transaction blocks other lockers of the same row until commit or rollback.
//! The wait is bounded server-side with `lock_timeout`, so an abandoned waiter
//! never keeps its backend, and its pooled connection, queued on the row.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::time::Duration;

use super::{
    errors::StoreResult,
    repository::{Store, StoreTransaction},
};
use crate::user::{NewUser, User, UserId};
use crate::wallet::{Wallet, WalletId};

fn wallet_from_row(row: &PgRow) -> Result<Wallet, sqlx::Error> {
    Ok(Wallet {
        wallet_id: row.try_get("wallet_id")?,
        user_id: row.try_get("user_id")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get::<chrono::NaiveDateTime, _>("created_at")?.and_utc(),
        updated_at: row.try_get::<chrono::NaiveDateTime, _>("updated_at")?.and_utc(),
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: row.try_get::<chrono::NaiveDateTime, _>("created_at")?.and_utc(),
        updated_at: row.try_get::<chrono::NaiveDateTime, _>("updated_at")?.and_utc(),
    })
}

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn get_wallet(&self, wallet_id: WalletId) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query(
            "SELECT wallet_id, user_id, balance, created_at, updated_at
             FROM wallets WHERE wallet_id = $1",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(wallet_from_row).transpose()?)
    }

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>> {
        let rows = sqlx::query(
            "SELECT wallet_id, user_id, balance, created_at, updated_at
             FROM wallets ORDER BY created_at, wallet_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(wallet_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, first_name, last_name, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, email, first_name, last_name, created_at, updated_at
             FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn save_user(&self, user: &User) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "UPDATE users
             SET email = $1, first_name = $2, last_name = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING id, email, first_name, last_name, created_at, updated_at",
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        // wallets_user_id_fkey cascades the delete to the wallet row.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction; rolls back when dropped uncommitted.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn get_wallet_for_update(
        &mut self,
        wallet_id: WalletId,
        lock_timeout: Duration,
    ) -> StoreResult<Option<Wallet>> {
        // A lock_timeout of 0 disables the limit.
        let millis = lock_timeout.as_millis().max(1);
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{millis}ms"))
            .execute(&mut *self.tx)
            .await?;

        let row = sqlx::query(
            "SELECT wallet_id, user_id, balance, created_at, updated_at
             FROM wallets WHERE wallet_id = $1
             FOR UPDATE",
        )
        .bind(wallet_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(wallet_from_row).transpose()?)
    }

    async fn save_wallet(&mut self, wallet_id: WalletId, balance: Decimal) -> StoreResult<Wallet> {
        let row = sqlx::query(
            "UPDATE wallets
             SET balance = $1, updated_at = NOW()
             WHERE wallet_id = $2
             RETURNING wallet_id, user_id, balance, created_at, updated_at",
        )
        .bind(balance)
        .bind(wallet_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(wallet_from_row(&row)?)
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, first_name, last_name)
             VALUES ($1, $2, $3)
             RETURNING id, email, first_name, last_name, created_at, updated_at",
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user_from_row(&row)?)
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<Wallet> {
        let row = sqlx::query(
            "INSERT INTO wallets (wallet_id, user_id, balance, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING wallet_id, user_id, balance, created_at, updated_at",
        )
        .bind(wallet.wallet_id)
        .bind(wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.created_at.naive_utc())
        .bind(wallet.updated_at.naive_utc())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(wallet_from_row(&row)?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
