use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RecordId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Side implied by a stored signed quantity: positive = buy, negative = sell.
    pub fn from_signed(shares: i64) -> Self {
        if shares > 0 {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        }
    }
}

/// Immutable ledger entry. `shares` is signed; `total = price * |shares|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: RecordId,
    pub account_id: Uuid,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn side(&self) -> TradeSide {
        TradeSide::from_signed(self.shares)
    }
}

/// A trade about to be appended. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrade {
    pub account_id: Uuid,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
}

impl NewTrade {
    pub fn buy(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Self {
        Self::signed(account_id, symbol, shares.abs(), price)
    }

    pub fn sell(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Self {
        Self::signed(account_id, symbol, -shares.abs(), price)
    }

    fn signed(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Self {
        Self {
            account_id,
            symbol: symbol.to_string(),
            shares,
            price,
            total: price * Decimal::from(shares.unsigned_abs()),
        }
    }

    /// Change to the account's cash when this trade commits.
    pub fn cash_delta(&self) -> Decimal {
        if self.shares > 0 { -self.total } else { self.total }
    }
}
