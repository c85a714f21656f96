//! Postgres-backed store. Applies run in one transaction holding the account row lock.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::accounts::{
    adjust_cash, get_account, get_account_by_username, insert_account, lock_cash, read_cash,
    update_credential,
};
use super::trades::{insert_trade, last_trade_time, list_trades_for_account, sum_shares};
use super::{AppliedTrade, LedgerSnapshot, LedgerStore, Precondition, StoreError};
use crate::types::account::{Account, AccountId};
use crate::types::trade::{NewTrade, TradeRecord};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = super::create_pool_and_migrate(database_url).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn create_account(
        &self,
        username: &str,
        credential_hash: &str,
        cash: Decimal,
    ) -> Result<Account, StoreError> {
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            cash,
            credential_hash: credential_hash.to_string(),
            created_at: Utc::now(),
        };
        insert_account(&self.pool, &account).await?;
        Ok(account)
    }

    async fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        get_account(&self.pool, id)
            .await?
            .map(Account::from)
            .ok_or(StoreError::NotFound(id))
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(get_account_by_username(&self.pool, username)
            .await?
            .map(Account::from))
    }

    async fn set_credential(&self, id: AccountId, credential_hash: &str) -> Result<(), StoreError> {
        if update_credential(&self.pool, id, credential_hash).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    async fn balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        let mut conn = self.pool.acquire().await?;
        read_cash(&mut conn, id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn sum_signed_quantity(&self, id: AccountId, symbol: &str) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sum_shares(&mut conn, id, symbol).await?)
    }

    async fn list_by_account(&self, id: AccountId) -> Result<Vec<TradeRecord>, StoreError> {
        Ok(self.snapshot(id).await?.records)
    }

    async fn snapshot(&self, id: AccountId) -> Result<LedgerSnapshot, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        let cash = read_cash(&mut tx, id).await?.ok_or(StoreError::NotFound(id))?;
        let records = list_trades_for_account(&mut tx, id).await?;
        tx.commit().await?;
        Ok(LedgerSnapshot { cash, records })
    }

    async fn apply_trade(
        &self,
        trade: NewTrade,
        precondition: Precondition,
    ) -> Result<AppliedTrade, StoreError> {
        // Any early return drops `tx`, which rolls back.
        let mut tx = self.pool.begin().await?;
        let cash = lock_cash(&mut tx, trade.account_id)
            .await?
            .ok_or(StoreError::NotFound(trade.account_id))?;
        let held = sum_shares(&mut tx, trade.account_id, &trade.symbol).await?;

        let holds = match precondition {
            Precondition::CashAtLeast(min) => cash >= min,
            Precondition::HoldingAtLeast(min) => held >= min,
        };
        if !holds {
            return Err(StoreError::ConditionFailed);
        }
        let balance_after = cash
            .checked_add(trade.cash_delta())
            .ok_or(StoreError::OutOfRange("cash balance"))?;
        let held_after = held
            .checked_add(trade.shares)
            .ok_or(StoreError::OutOfRange("holding"))?;
        if balance_after < Decimal::ZERO || held_after < 0 {
            return Err(StoreError::ConditionFailed);
        }

        let now = Utc::now();
        let timestamp = last_trade_time(&mut tx, trade.account_id)
            .await?
            .map_or(now, |last| last.max(now));
        let id = insert_trade(&mut tx, &trade, timestamp).await?;
        let new_balance = adjust_cash(&mut tx, trade.account_id, trade.cash_delta()).await?;
        tx.commit().await?;

        Ok(AppliedTrade {
            record: TradeRecord {
                id,
                account_id: trade.account_id,
                symbol: trade.symbol,
                shares: trade.shares,
                price: trade.price,
                total: trade.total,
                timestamp,
            },
            new_balance,
        })
    }
}
