//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use paper_ledger::credentials::{CredentialError, CredentialHasher};
use paper_ledger::engine::{Engine, EngineConfig, SharedEngine};
use paper_ledger::persistence::{
    AppliedTrade, LedgerSnapshot, LedgerStore, MemoryStore, Precondition, StoreError,
};
use paper_ledger::quotes::{QuoteError, QuoteService, StaticQuotes};
use paper_ledger::types::account::{Account, AccountId};
use paper_ledger::types::quote::Quote;
use paper_ledger::types::trade::{NewTrade, TradeRecord};
use rust_decimal::Decimal;

/// Cheap stand-in for argon2 so engine tests stay fast.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        hash == format!("plain${secret}")
    }
}

pub struct Harness {
    pub engine: SharedEngine,
    pub store: MemoryStore,
    pub quotes: StaticQuotes,
}

pub fn config(starting_cash: Decimal) -> EngineConfig {
    EngineConfig {
        starting_cash,
        quote_timeout: Duration::from_millis(500),
        max_apply_attempts: 3,
    }
}

pub async fn static_quotes(table: &[(&str, Decimal)]) -> StaticQuotes {
    let quotes = StaticQuotes::new();
    for (symbol, price) in table {
        quotes.set_price(symbol, *price).await;
    }
    quotes
}

pub fn engine_over(
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteService>,
    config: EngineConfig,
) -> SharedEngine {
    Arc::new(Engine::new(store, quotes, config).with_hasher(Arc::new(PlainHasher)))
}

pub async fn harness(starting_cash: Decimal, table: &[(&str, Decimal)]) -> Harness {
    let store = MemoryStore::new();
    let quotes = static_quotes(table).await;
    let engine = engine_over(
        Arc::new(store.clone()),
        Arc::new(quotes.clone()),
        config(starting_cash),
    );
    Harness {
        engine,
        store,
        quotes,
    }
}

impl Harness {
    pub async fn account(&self, username: &str) -> AccountId {
        self.engine.register(username, "pw").await.unwrap().id
    }
}

/// Delegates to a `MemoryStore` but reports `ConditionFailed` for the first N applies.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn create_account(
        &self,
        username: &str,
        credential_hash: &str,
        cash: Decimal,
    ) -> Result<Account, StoreError> {
        self.inner.create_account(username, credential_hash, cash).await
    }

    async fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.account(id).await
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.inner.account_by_username(username).await
    }

    async fn set_credential(&self, id: AccountId, credential_hash: &str) -> Result<(), StoreError> {
        self.inner.set_credential(id, credential_hash).await
    }

    async fn balance(&self, id: AccountId) -> Result<Decimal, StoreError> {
        self.inner.balance(id).await
    }

    async fn sum_signed_quantity(&self, id: AccountId, symbol: &str) -> Result<i64, StoreError> {
        self.inner.sum_signed_quantity(id, symbol).await
    }

    async fn list_by_account(&self, id: AccountId) -> Result<Vec<TradeRecord>, StoreError> {
        self.inner.list_by_account(id).await
    }

    async fn snapshot(&self, id: AccountId) -> Result<LedgerSnapshot, StoreError> {
        self.inner.snapshot(id).await
    }

    async fn apply_trade(
        &self,
        trade: NewTrade,
        precondition: Precondition,
    ) -> Result<AppliedTrade, StoreError> {
        let pending = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(StoreError::ConditionFailed);
        }
        self.inner.apply_trade(trade, precondition).await
    }
}

/// Answers every lookup after a fixed delay.
pub struct SlowQuotes {
    pub delay: Duration,
    pub price: Decimal,
}

#[async_trait]
impl QuoteService for SlowQuotes {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        tokio::time::sleep(self.delay).await;
        Ok(Quote {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price: self.price,
        })
    }
}

/// Static table for most symbols, unavailable for one.
pub struct PartialOutage {
    pub table: StaticQuotes,
    pub down: String,
}

#[async_trait]
impl QuoteService for PartialOutage {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        if symbol == self.down {
            return Err(QuoteError::Unavailable(format!("{symbol} feed down")));
        }
        self.table.lookup(symbol).await
    }
}
