use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::trade::{RecordId, TradeRecord, TradeSide};

/// Open holding for one symbol (sum of signed quantities, strictly positive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: i64,
}

/// Holding valued at the current quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
}

impl Position {
    /// `None` when `price * shares` is not representable.
    pub fn new(symbol: String, shares: i64, price: Decimal) -> Option<Self> {
        let total = price.checked_mul(Decimal::from(shares))?;
        Some(Self {
            total,
            symbol,
            shares,
            price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub cash: Decimal,
    pub grand_total: Decimal,
}

impl Portfolio {
    pub fn new(positions: Vec<Position>, cash: Decimal) -> Option<Self> {
        let grand_total = positions
            .iter()
            .try_fold(cash, |acc, p| acc.checked_add(p.total))?;
        Some(Self {
            positions,
            cash,
            grand_total,
        })
    }
}

/// One row of the transaction history, tagged by the sign of its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: RecordId,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub side: TradeSide,
}

impl From<TradeRecord> for HistoryEntry {
    fn from(record: TradeRecord) -> Self {
        Self {
            side: record.side(),
            id: record.id,
            symbol: record.symbol,
            shares: record.shares,
            price: record.price,
            total: record.total,
            timestamp: record.timestamp,
        }
    }
}

/// Result of a committed buy or sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub record_id: RecordId,
    pub new_balance: Decimal,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
}

impl TradeReceipt {
    pub fn new(record: &TradeRecord, new_balance: Decimal) -> Self {
        Self {
            record_id: record.id,
            new_balance,
            symbol: record.symbol.clone(),
            shares: record.shares,
            price: record.price,
            total: record.total,
        }
    }
}
