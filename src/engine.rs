//! Ledger & balance engine: validates trades against live quotes and current
//! state, applies them atomically, and answers portfolio and history queries.
//!
//! Trades for one account run under that account's mutex, and every apply is
//! also conditional at the store, so a stale read can never commit.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::credentials::{Argon2Hasher, CredentialHasher};
use crate::error::LedgerError;
use crate::holdings;
use crate::persistence::{LedgerStore, Precondition, StoreError};
use crate::quotes::QuoteService;
use crate::types::account::{Account, AccountId};
use crate::types::portfolio::{HistoryEntry, Holding, Portfolio, Position, TradeReceipt};
use crate::types::quote::Quote;
use crate::types::trade::NewTrade;

pub type SharedEngine = Arc<Engine>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cash credited to a newly registered account.
    pub starting_cash: Decimal,
    pub quote_timeout: Duration,
    /// Apply attempts before a conflicting trade gives up.
    pub max_apply_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::new(10_000_00, 2),
            quote_timeout: Duration::from_secs(5),
            max_apply_attempts: 3,
        }
    }
}

pub struct Engine {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteService>,
    hasher: Arc<dyn CredentialHasher>,
    config: EngineConfig,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

/// Trim and uppercase; empty is invalid.
pub fn normalize_symbol(symbol: &str) -> Result<String, LedgerError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(LedgerError::InvalidInput("must provide symbol".into()));
    }
    Ok(symbol)
}

fn validate_quantity(quantity: i64) -> Result<i64, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidInput(
            "shares must be a positive integer".into(),
        ));
    }
    Ok(quantity)
}

fn normalize_username(username: &str) -> Result<String, LedgerError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(LedgerError::InvalidInput("username is required".into()));
    }
    Ok(username)
}

fn require_secret(secret: &str) -> Result<(), LedgerError> {
    if secret.is_empty() {
        return Err(LedgerError::InvalidInput("password is required".into()));
    }
    Ok(())
}

fn order_value(price: Decimal, shares: i64) -> Result<Decimal, LedgerError> {
    price
        .checked_mul(Decimal::from(shares))
        .ok_or_else(|| LedgerError::InvalidInput("order value out of range".into()))
}

impl Engine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            quotes,
            hasher: Arc::new(Argon2Hasher),
            config,
            locks: DashMap::new(),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Per-account trade mutex. Only existing accounts get an entry, so the map
    /// holds at most one lock per account.
    async fn account_lock(&self, id: AccountId) -> Result<Arc<Mutex<()>>, LedgerError> {
        if let Some(lock) = self.locks.get(&id) {
            return Ok(Arc::clone(&lock));
        }
        self.store.account(id).await?;
        Ok(Arc::clone(&self.locks.entry(id).or_default()))
    }

    /// Quote lookup bounded by the configured timeout. Non-positive prices count as unknown.
    async fn resolve(&self, symbol: &str) -> Result<Quote, LedgerError> {
        let quote = tokio::time::timeout(self.config.quote_timeout, self.quotes.lookup(symbol))
            .await
            .map_err(|_| LedgerError::QuoteUnavailable(format!("quote for {symbol} timed out")))??;
        if quote.price <= Decimal::ZERO {
            return Err(LedgerError::UnknownSymbol(symbol.to_string()));
        }
        Ok(quote)
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        self.resolve(&symbol).await
    }

    pub async fn execute_buy(
        &self,
        account_id: AccountId,
        symbol: &str,
        quantity: i64,
    ) -> Result<TradeReceipt, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        let shares = validate_quantity(quantity)?;

        let lock = self.account_lock(account_id).await?;
        let _guard = lock.lock().await;

        for attempt in 1..=self.config.max_apply_attempts {
            let quote = self.resolve(&symbol).await?;
            let cost = order_value(quote.price, shares)?;
            let cash = self.store.balance(account_id).await?;
            if cash < cost {
                return Err(LedgerError::InsufficientFunds {
                    needed: cost,
                    available: cash,
                });
            }

            let trade = NewTrade::buy(account_id, &symbol, shares, quote.price);
            match self
                .store
                .apply_trade(trade, Precondition::CashAtLeast(cost))
                .await
            {
                Ok(applied) => {
                    info!(%account_id, %symbol, shares, price = %quote.price, "buy committed");
                    return Ok(TradeReceipt::new(&applied.record, applied.new_balance));
                }
                Err(StoreError::ConditionFailed) => {
                    warn!(%account_id, %symbol, attempt, "buy conflicted at apply, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Contention {
            attempts: self.config.max_apply_attempts,
        })
    }

    pub async fn execute_sell(
        &self,
        account_id: AccountId,
        symbol: &str,
        quantity: i64,
    ) -> Result<TradeReceipt, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        let shares = validate_quantity(quantity)?;

        let lock = self.account_lock(account_id).await?;
        let _guard = lock.lock().await;

        for attempt in 1..=self.config.max_apply_attempts {
            let held = self.store.sum_signed_quantity(account_id, &symbol).await?;
            if held < shares {
                return Err(LedgerError::InsufficientHoldings {
                    symbol,
                    requested: shares,
                    held,
                });
            }
            let quote = self.resolve(&symbol).await?;
            order_value(quote.price, shares)?;

            let trade = NewTrade::sell(account_id, &symbol, shares, quote.price);
            match self
                .store
                .apply_trade(trade, Precondition::HoldingAtLeast(shares))
                .await
            {
                Ok(applied) => {
                    info!(%account_id, %symbol, shares, price = %quote.price, "sell committed");
                    return Ok(TradeReceipt::new(&applied.record, applied.new_balance));
                }
                Err(StoreError::ConditionFailed) => {
                    warn!(%account_id, %symbol, attempt, "sell conflicted at apply, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Contention {
            attempts: self.config.max_apply_attempts,
        })
    }

    /// Open positions valued at live prices. Any failed lookup fails the whole query.
    pub async fn get_portfolio(&self, account_id: AccountId) -> Result<Portfolio, LedgerError> {
        let snapshot = self.store.snapshot(account_id).await?;
        let open = holdings::open_holdings(&snapshot.records);

        let positions = try_join_all(open.into_iter().map(|h| async move {
            let quote = self.resolve(&h.symbol).await.map_err(|e| match e {
                LedgerError::UnknownSymbol(s) => {
                    LedgerError::QuoteUnavailable(format!("no live price for held symbol {s}"))
                }
                other => other,
            })?;
            Position::new(h.symbol.clone(), h.shares, quote.price).ok_or_else(|| {
                LedgerError::ValueOutOfRange(format!(
                    "{} shares of {} at {}",
                    h.shares, h.symbol, quote.price
                ))
            })
        }))
        .await?;

        Portfolio::new(positions, snapshot.cash)
            .ok_or_else(|| LedgerError::ValueOutOfRange("portfolio grand total".into()))
    }

    pub async fn get_history(&self, account_id: AccountId) -> Result<Vec<HistoryEntry>, LedgerError> {
        let records = self.store.list_by_account(account_id).await?;
        Ok(holdings::history(records))
    }

    /// Symbols the account can currently sell, without pricing them.
    pub async fn open_holdings(&self, account_id: AccountId) -> Result<Vec<Holding>, LedgerError> {
        let records = self.store.list_by_account(account_id).await?;
        Ok(holdings::open_holdings(&records))
    }

    pub async fn register(&self, username: &str, secret: &str) -> Result<Account, LedgerError> {
        let username = normalize_username(username)?;
        require_secret(secret)?;
        let hash = self.hasher.hash(secret)?;
        let account = self
            .store
            .create_account(&username, &hash, self.config.starting_cash)
            .await?;
        info!(account_id = %account.id, %username, "account registered");
        Ok(account)
    }

    pub async fn authenticate(&self, username: &str, secret: &str) -> Result<Account, LedgerError> {
        let username = normalize_username(username).map_err(|_| LedgerError::InvalidCredentials)?;
        let Some(account) = self.store.account_by_username(&username).await? else {
            warn!(%username, "login for unknown username");
            return Err(LedgerError::InvalidCredentials);
        };
        if !self.hasher.verify(secret, &account.credential_hash) {
            warn!(%username, "login with wrong password");
            return Err(LedgerError::InvalidCredentials);
        }
        Ok(account)
    }

    pub async fn change_secret(
        &self,
        account_id: AccountId,
        old_secret: &str,
        new_secret: &str,
    ) -> Result<(), LedgerError> {
        let account = self.store.account(account_id).await?;
        if !self.hasher.verify(old_secret, &account.credential_hash) {
            warn!(%account_id, "password change with wrong current password");
            return Err(LedgerError::InvalidCredentials);
        }
        require_secret(new_secret)?;
        let hash = self.hasher.hash(new_secret)?;
        self.store.set_credential(account_id, &hash).await?;
        info!(%account_id, "password changed");
        Ok(())
    }
}
