//! Trade persistence: append, holding sums, per-account listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::types::trade::{NewTrade, RecordId, TradeRecord};

#[derive(Debug, FromRow)]
pub struct TradeRow {
    pub id: i64,
    pub account_id: Uuid,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

fn trade_row_to_record(row: TradeRow) -> TradeRecord {
    TradeRecord {
        id: row.id,
        account_id: row.account_id,
        symbol: row.symbol,
        shares: row.shares,
        price: row.price,
        total: row.total,
        timestamp: row.created_at,
    }
}

/// List trades for an account, newest first.
pub async fn list_trades_for_account(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Vec<TradeRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TradeRow>(
        "SELECT id, account_id, symbol, shares, price, total, created_at \
         FROM trades WHERE account_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(account_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(trade_row_to_record).collect())
}

/// Sum of signed shares for (account, symbol); 0 when there are no trades.
pub async fn sum_shares(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(shares), 0)::BIGINT FROM trades WHERE account_id = $1 AND symbol = $2",
    )
    .bind(account_id)
    .bind(symbol)
    .fetch_one(conn)
    .await
}

/// Latest timestamp recorded for an account, if any.
pub async fn last_trade_time(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(created_at) FROM trades WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(conn)
        .await
}

/// Insert a single trade, returning its id.
pub async fn insert_trade(
    conn: &mut PgConnection,
    trade: &NewTrade,
    created_at: DateTime<Utc>,
) -> Result<RecordId, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO trades (account_id, symbol, shares, price, total, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(trade.account_id)
    .bind(&trade.symbol)
    .bind(trade.shares)
    .bind(trade.price)
    .bind(trade.total)
    .bind(created_at)
    .fetch_one(conn)
    .await
}
