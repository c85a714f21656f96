pub mod account;
pub mod portfolio;
pub mod quote;
pub mod trade;
