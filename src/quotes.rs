//! Quote service: trait plus a static table and an HTTP client.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::quote::Quote;

#[derive(Debug, Clone, thiserror::Error)]
pub enum QuoteError {
    #[error("no quote for symbol {0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Rejected entry in a `SYM=PRICE,...` quote table.
#[derive(Debug, thiserror::Error)]
pub enum QuoteTableError {
    #[error("expected SYMBOL=PRICE, got '{0}'")]
    Malformed(String),

    #[error("empty symbol in '{0}'")]
    EmptySymbol(String),

    #[error("bad price for {symbol}: {source}")]
    BadPrice {
        symbol: String,
        source: rust_decimal::Error,
    },
}

/// Price lookup. Symbols are passed already uppercased.
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// In-memory quote table. Prices can be changed at runtime.
#[derive(Clone, Default)]
pub struct StaticQuotes {
    quotes: Arc<RwLock<HashMap<String, Quote>>>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `SYM=PRICE,SYM=PRICE`. Entries with an empty symbol or bad price are rejected.
    pub fn parse(table: &str) -> Result<Self, QuoteTableError> {
        let mut quotes = HashMap::new();
        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (symbol, price) = entry
                .split_once('=')
                .ok_or_else(|| QuoteTableError::Malformed(entry.to_string()))?;
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Err(QuoteTableError::EmptySymbol(entry.to_string()));
            }
            let price = Decimal::from_str(price.trim())
                .map_err(|source| QuoteTableError::BadPrice {
                    symbol: symbol.clone(),
                    source,
                })?;
            quotes.insert(
                symbol.clone(),
                Quote {
                    name: symbol.clone(),
                    symbol,
                    price,
                },
            );
        }
        Ok(Self {
            quotes: Arc::new(RwLock::new(quotes)),
        })
    }

    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        let symbol = symbol.to_uppercase();
        let mut guard = self.quotes.write().await;
        guard
            .entry(symbol.clone())
            .and_modify(|q| q.price = price)
            .or_insert(Quote {
                name: symbol.clone(),
                symbol,
                price,
            });
    }

    pub async fn remove(&self, symbol: &str) {
        self.quotes.write().await.remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl QuoteService for StaticQuotes {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.quotes
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuoteError::NotFound(symbol.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    name: String,
    price: Decimal,
    symbol: String,
}

/// Client for a JSON quote API: `GET {base_url}/quote?symbol=SYM` -> `{name, price, symbol}`.
#[derive(Clone)]
pub struct HttpQuotes {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuotes {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl QuoteService for HttpQuotes {
    async fn lookup(&self, symbol: &str) -> Result<Quote, QuoteError> {
        debug!(symbol, "looking up quote");
        let res = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::NotFound(symbol.to_string()));
        }
        let res = res
            .error_for_status()
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;

        // The upstream API answers unknown symbols with a null body.
        let body: Option<QuoteResponse> = res
            .json()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;
        let body = body.ok_or_else(|| QuoteError::NotFound(symbol.to_string()))?;
        Ok(Quote {
            symbol: body.symbol.to_uppercase(),
            name: body.name,
            price: body.price,
        })
    }
}
