//! Holdings and history derived from trade records. Pure functions, no I/O.

use std::collections::BTreeMap;

use crate::types::portfolio::{HistoryEntry, Holding};
use crate::types::trade::TradeRecord;

/// Sum of signed quantities for one symbol.
pub fn net_shares(records: &[TradeRecord], symbol: &str) -> i64 {
    records
        .iter()
        .filter(|r| r.symbol == symbol)
        .fold(0i64, |acc, r| acc.saturating_add(r.shares))
}

/// Symbols with a strictly positive net quantity, sorted by symbol.
pub fn open_holdings(records: &[TradeRecord]) -> Vec<Holding> {
    let mut sums: BTreeMap<&str, i64> = BTreeMap::new();
    for r in records {
        let sum = sums.entry(r.symbol.as_str()).or_insert(0);
        *sum = sum.saturating_add(r.shares);
    }
    sums.into_iter()
        .filter(|&(_, shares)| shares > 0)
        .map(|(symbol, shares)| Holding {
            symbol: symbol.to_string(),
            shares,
        })
        .collect()
}

/// History rows newest first (timestamp, then id), tagged BUY/SELL.
pub fn history(mut records: Vec<TradeRecord>) -> Vec<HistoryEntry> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    records.into_iter().map(HistoryEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::trade::TradeSide;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn record(id: i64, symbol: &str, shares: i64, secs: i64) -> TradeRecord {
        TradeRecord {
            id,
            account_id: Uuid::nil(),
            symbol: symbol.to_string(),
            shares,
            price: dec!(10),
            total: dec!(10) * rust_decimal::Decimal::from(shares.unsigned_abs()),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs),
        }
    }

    #[test]
    fn net_shares_sums_signed_quantities() {
        let records = vec![
            record(1, "AAA", 10, 0),
            record(2, "AAA", -4, 1),
            record(3, "BBB", 3, 2),
        ];
        assert_eq!(net_shares(&records, "AAA"), 6);
        assert_eq!(net_shares(&records, "BBB"), 3);
        assert_eq!(net_shares(&records, "CCC"), 0);
    }

    #[test]
    fn closed_positions_are_omitted() {
        let records = vec![
            record(1, "BBB", 5, 0),
            record(2, "AAA", 2, 1),
            record(3, "BBB", -5, 2),
            record(4, "CCC", 1, 3),
        ];
        let open = open_holdings(&records);
        let symbols: Vec<&str> = open.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "CCC"]);
    }

    #[test]
    fn history_is_newest_first_and_tagged() {
        let records = vec![
            record(1, "AAA", 10, 0),
            record(2, "AAA", -3, 5),
            record(3, "BBB", 1, 5),
        ];
        let rows = history(records);
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(rows[1].side, TradeSide::Sell);
        assert_eq!(rows[1].shares, -3);
        assert_eq!(rows[2].side, TradeSide::Buy);
    }
}
