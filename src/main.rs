use std::sync::Arc;

use paper_ledger::api::routes::{AppState, app_router};
use paper_ledger::config::{ConfigError, Settings};
use paper_ledger::engine::Engine;
use paper_ledger::persistence::{LedgerStore, MemoryStore, PgStore};
use paper_ledger::quotes::{HttpQuotes, QuoteService, StaticQuotes};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paper_ledger=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn LedgerStore> = match &settings.database_url {
        Some(url) => {
            info!("using postgres store");
            Arc::new(PgStore::connect(url).await?)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let quotes: Arc<dyn QuoteService> = match &settings.quote_api_url {
        Some(url) => Arc::new(HttpQuotes::new(url.clone())),
        None => {
            let table =
                StaticQuotes::parse(&settings.quote_table).map_err(|e| ConfigError::Invalid {
                    key: "QUOTE_TABLE",
                    reason: e.to_string(),
                })?;
            warn!("QUOTE_API_URL not set, using static quote table");
            Arc::new(table)
        }
    };

    let engine = Arc::new(Engine::new(store, quotes, settings.engine.clone()));
    let app = app_router(AppState {
        engine,
        jwt_secret: settings.jwt_secret.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
