//! Paper trading ledger: buy and sell named instruments against a cash
//! balance, with holdings and history derived from an append-only trade log.

pub mod api;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod holdings;
pub mod persistence;
pub mod quotes;
pub mod types;
