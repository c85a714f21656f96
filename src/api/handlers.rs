//! Trading and query endpoints. All require an authenticated account.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::error::LedgerError;
use crate::types::portfolio::{HistoryEntry, Holding, Portfolio, TradeReceipt};
use crate::types::quote::Quote;

/// `shares` is kept raw so a fraction, a string or a missing value is reported
/// as invalid input rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub shares: Value,
}

impl TradeRequest {
    /// Positive whole number of shares, at most `u32::MAX`. Numeric strings are accepted.
    pub fn shares(&self) -> Result<i64, LedgerError> {
        let shares = match &self.shares {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        shares
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0)
            .map(i64::from)
            .ok_or_else(|| LedgerError::InvalidInput("shares must be a positive integer".into()))
    }
}

pub async fn quote(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.engine.quote(&symbol).await?))
}

pub async fn buy(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<TradeReceipt>, ApiError> {
    let Json(req) = payload?;
    let receipt = state
        .engine
        .execute_buy(user.account_id, &req.symbol, req.shares()?)
        .await?;
    Ok(Json(receipt))
}

pub async fn sell(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<TradeReceipt>, ApiError> {
    let Json(req) = payload?;
    let receipt = state
        .engine
        .execute_sell(user.account_id, &req.symbol, req.shares()?)
        .await?;
    Ok(Json(receipt))
}

pub async fn portfolio(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Portfolio>, ApiError> {
    Ok(Json(state.engine.get_portfolio(user.account_id).await?))
}

pub async fn sellable(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Holding>>, ApiError> {
    Ok(Json(state.engine.open_holdings(user.account_id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    Ok(Json(state.engine.get_history(user.account_id).await?))
}
