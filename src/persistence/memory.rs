//! In-memory store. One `RwLock` over accounts, ledger and the holdings index,
//! so every apply and every snapshot sees a single consistent state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AppliedTrade, LedgerSnapshot, LedgerStore, Precondition, StoreError};
use crate::types::account::{Account, AccountId};
use crate::types::trade::{NewTrade, RecordId, TradeRecord};

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    usernames: HashMap<String, AccountId>,
    /// The ledger: append-only, indexed by position.
    records: Vec<TradeRecord>,
    by_account: HashMap<AccountId, Vec<usize>>,
    /// Derived index over `records`, updated in the same step as the append.
    holdings: HashMap<(AccountId, String), i64>,
    next_id: RecordId,
}

impl Inner {
    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))
    }

    fn holding(&self, id: AccountId, symbol: &str) -> i64 {
        self.holdings
            .get(&(id, symbol.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn records_newest_first(&self, id: AccountId) -> Vec<TradeRecord> {
        self.by_account
            .get(&id)
            .map(|idx| idx.iter().rev().map(|&i| self.records[i].clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the holdings index from the ledger and report whether it matched.
    pub async fn verify_holdings_index(&self) -> bool {
        let guard = self.inner.read().await;
        let mut rebuilt: HashMap<(AccountId, String), i64> = HashMap::new();
        for r in &guard.records {
            *rebuilt.entry((r.account_id, r.symbol.clone())).or_insert(0) += r.shares;
        }
        rebuilt == guard.holdings
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_account(
        &self,
        username: &str,
        credential_hash: &str,
        cash: Decimal,
    ) -> Result<Account, StoreError> {
        let mut guard = self.inner.write().await;
        if guard.usernames.contains_key(username) {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            cash,
            credential_hash: credential_hash.to_string(),
            created_at: Utc::now(),
        };
        guard.usernames.insert(account.username.clone(), account.id);
        guard.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner
            .read()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .usernames
            .get(username)
            .and_then(|id| guard.accounts.get(id))
            .cloned())
    }

    async fn set_credential(&self, id: AccountId, credential_hash: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.account_mut(id)?.credential_hash = credential_hash.to_string();
        Ok(())
    }

    async fn balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        self.account(id).await.map(|a| a.cash)
    }

    async fn sum_signed_quantity(&self, id: AccountId, symbol: &str) -> Result<i64, StoreError> {
        let guard = self.inner.read().await;
        if !guard.accounts.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(guard.holding(id, symbol))
    }

    async fn list_by_account(&self, id: AccountId) -> Result<Vec<TradeRecord>, StoreError> {
        let guard = self.inner.read().await;
        if !guard.accounts.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(guard.records_newest_first(id))
    }

    async fn snapshot(&self, id: AccountId) -> Result<LedgerSnapshot, StoreError> {
        let guard = self.inner.read().await;
        let cash = guard
            .accounts
            .get(&id)
            .map(|a| a.cash)
            .ok_or(StoreError::NotFound(id))?;
        Ok(LedgerSnapshot {
            cash,
            records: guard.records_newest_first(id),
        })
    }

    async fn apply_trade(
        &self,
        trade: NewTrade,
        precondition: Precondition,
    ) -> Result<AppliedTrade, StoreError> {
        let mut guard = self.inner.write().await;
        let cash = guard
            .accounts
            .get(&trade.account_id)
            .map(|a| a.cash)
            .ok_or(StoreError::NotFound(trade.account_id))?;

        let held = guard.holding(trade.account_id, &trade.symbol);
        let holds = match precondition {
            Precondition::CashAtLeast(min) => cash >= min,
            Precondition::HoldingAtLeast(min) => held >= min,
        };
        if !holds {
            return Err(StoreError::ConditionFailed);
        }
        let new_balance = cash
            .checked_add(trade.cash_delta())
            .ok_or(StoreError::OutOfRange("cash balance"))?;
        let new_held = held
            .checked_add(trade.shares)
            .ok_or(StoreError::OutOfRange("holding"))?;
        if new_balance < Decimal::ZERO || new_held < 0 {
            return Err(StoreError::ConditionFailed);
        }

        // Timestamps never go backwards within an account.
        let now = Utc::now();
        let timestamp = guard
            .by_account
            .get(&trade.account_id)
            .and_then(|idx| idx.last())
            .map_or(now, |&i| guard.records[i].timestamp.max(now));

        guard.next_id += 1;
        let record = TradeRecord {
            id: guard.next_id,
            account_id: trade.account_id,
            symbol: trade.symbol,
            shares: trade.shares,
            price: trade.price,
            total: trade.total,
            timestamp,
        };

        let position = guard.records.len();
        guard.records.push(record.clone());
        guard
            .by_account
            .entry(record.account_id)
            .or_default()
            .push(position);
        guard
            .holdings
            .insert((record.account_id, record.symbol.clone()), new_held);
        guard.account_mut(record.account_id)?.cash = new_balance;

        Ok(AppliedTrade {
            record,
            new_balance,
        })
    }
}
