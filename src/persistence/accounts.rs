//! Account rows: insert, lookup, credential and cash updates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::StoreError;
use crate::types::account::Account;

/// Row returned from DB (username is stored lowercase).
#[derive(FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub credential_hash: String,
    pub cash: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            cash: row.cash,
            credential_hash: row.credential_hash,
            created_at: row.created_at,
        }
    }
}

/// Insert an account. Unique violation on username becomes `UsernameTaken`.
pub async fn insert_account(pool: &PgPool, account: &Account) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO accounts (id, username, credential_hash, cash, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(account.id)
    .bind(&account.username)
    .bind(&account.credential_hash)
    .bind(account.cash)
    .bind(account.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            StoreError::UsernameTaken(account.username.clone())
        } else {
            StoreError::Database(e)
        }
    })?;
    Ok(())
}

pub async fn get_account(pool: &PgPool, id: Uuid) -> Result<Option<AccountRow>, sqlx::Error> {
    sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, credential_hash, cash, created_at FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get an account by username (lowercase).
pub async fn get_account_by_username(
    pool: &PgPool,
    username_lowercase: &str,
) -> Result<Option<AccountRow>, sqlx::Error> {
    sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, credential_hash, cash, created_at FROM accounts WHERE username = $1",
    )
    .bind(username_lowercase)
    .fetch_optional(pool)
    .await
}

/// Returns false when no such account exists.
pub async fn update_credential(
    pool: &PgPool,
    id: Uuid,
    credential_hash: &str,
) -> Result<bool, sqlx::Error> {
    let done = sqlx::query("UPDATE accounts SET credential_hash = $1 WHERE id = $2")
        .bind(credential_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() == 1)
}

/// Read cash and take a row lock held until the surrounding transaction ends.
pub async fn lock_cash(conn: &mut PgConnection, id: Uuid) -> Result<Option<Decimal>, sqlx::Error> {
    sqlx::query_scalar("SELECT cash FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn read_cash(conn: &mut PgConnection, id: Uuid) -> Result<Option<Decimal>, sqlx::Error> {
    sqlx::query_scalar("SELECT cash FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Add `delta` to cash, returning the new balance.
pub async fn adjust_cash(
    conn: &mut PgConnection,
    id: Uuid,
    delta: Decimal,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar("UPDATE accounts SET cash = cash + $1 WHERE id = $2 RETURNING cash")
        .bind(delta)
        .bind(id)
        .fetch_one(conn)
        .await
}
