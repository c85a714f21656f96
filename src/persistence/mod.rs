//! Account and ledger storage: the store contract, an in-memory store and a Postgres store.

mod accounts;
mod memory;
mod pool;
mod postgres;
mod trades;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::types::account::{Account, AccountId};
use crate::types::trade::{NewTrade, TradeRecord};

pub use memory::MemoryStore;
pub use pool::{create_pool_and_migrate, run_migrations};
pub use postgres::PgStore;
pub use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The conditional apply found its precondition false at commit time.
    #[error("precondition failed at apply")]
    ConditionFailed,

    /// The apply would push cash or a holding past what its type can represent.
    #[error("{0} out of range")]
    OutOfRange(&'static str),

    #[error("username {0} already taken")]
    UsernameTaken(String),

    #[error("account {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Guard checked inside the atomic apply, against the state the store holds at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Account cash must be at least this amount (buy).
    CashAtLeast(Decimal),
    /// Holding of the trade's symbol must be at least this many shares (sell).
    HoldingAtLeast(i64),
}

/// Outcome of a committed apply: the appended record and the balance after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTrade {
    pub record: TradeRecord,
    pub new_balance: Decimal,
}

/// Cash and trade records for one account, read at a single point in time.
/// `records` are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub cash: Decimal,
    pub records: Vec<TradeRecord>,
}

/// Account store plus ledger store. `apply_trade` is the only write path for
/// cash and trades, and commits the ledger append with its balance change or
/// neither.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(
        &self,
        username: &str,
        credential_hash: &str,
        cash: Decimal,
    ) -> Result<Account, StoreError>;

    async fn account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Username must already be lowercase.
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn set_credential(&self, id: AccountId, credential_hash: &str) -> Result<(), StoreError>;

    async fn balance(&self, id: AccountId) -> Result<Decimal, StoreError>;

    async fn sum_signed_quantity(&self, id: AccountId, symbol: &str) -> Result<i64, StoreError>;

    /// All records for the account, newest first (timestamp, then id).
    async fn list_by_account(&self, id: AccountId) -> Result<Vec<TradeRecord>, StoreError>;

    async fn snapshot(&self, id: AccountId) -> Result<LedgerSnapshot, StoreError>;

    async fn apply_trade(
        &self,
        trade: NewTrade,
        precondition: Precondition,
    ) -> Result<AppliedTrade, StoreError>;
}
