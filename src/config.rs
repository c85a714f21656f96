//! Settings loaded from the environment (and `.env` when present).

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::engine::EngineConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    /// Postgres URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    /// Base URL of the JSON quote API. `None` uses `quote_table`.
    pub quote_api_url: Option<String>,
    /// `SYM=PRICE,...` used when no quote API is configured.
    pub quote_table: String,
    pub engine: EngineConfig,
}

fn parse<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .ok_or(ConfigError::Missing("JWT_SECRET"))?
            .into_bytes();
        let defaults = EngineConfig::default();
        let starting_cash: Decimal = parse("STARTING_CASH", get("STARTING_CASH"), defaults.starting_cash)?;
        if starting_cash < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "STARTING_CASH",
                reason: "must not be negative".into(),
            });
        }
        let timeout_ms: u64 = parse(
            "QUOTE_TIMEOUT_MS",
            get("QUOTE_TIMEOUT_MS"),
            defaults.quote_timeout.as_millis() as u64,
        )?;
        let max_apply_attempts: u32 =
            parse("MAX_APPLY_ATTEMPTS", get("MAX_APPLY_ATTEMPTS"), defaults.max_apply_attempts)?;
        if max_apply_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_APPLY_ATTEMPTS",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_url: get("DATABASE_URL"),
            jwt_secret,
            quote_api_url: get("QUOTE_API_URL"),
            quote_table: get("QUOTE_TABLE").unwrap_or_default(),
            engine: EngineConfig {
                starting_cash,
                quote_timeout: Duration::from_millis(timeout_ms),
                max_apply_attempts,
            },
        })
    }
}
