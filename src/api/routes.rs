use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::api::{auth, handlers};
use crate::engine::SharedEngine;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub jwt_secret: Vec<u8>,
}

async fn health() -> &'static str {
    "healthy"
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/password", post(auth::change_password))
        .route("/quote/{symbol}", get(handlers::quote))
        .route("/buy", post(handlers::buy))
        .route("/sell", post(handlers::sell))
        .route("/portfolio", get(handlers::portfolio))
        .route("/portfolio/sellable", get(handlers::sellable))
        .route("/history", get(handlers::history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
