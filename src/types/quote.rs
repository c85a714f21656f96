use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current price of an instrument as reported by the quote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
