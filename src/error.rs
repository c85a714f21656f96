//! Error taxonomy returned by the engine.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::credentials::CredentialError;
use crate::persistence::StoreError;
use crate::quotes::QuoteError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient holdings of {symbol}: requested {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// A valuation produced a number too large to represent.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("trade not applied after {attempts} conflicting attempts")]
    Contention { attempts: u32 },

    #[error("username {0} already taken")]
    UsernameTaken(String),

    #[error("invalid username and/or password")]
    InvalidCredentials,

    #[error("unknown account {0}")]
    UnknownAccount(Uuid),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    /// Stable machine-readable tag for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::UnknownSymbol(_) => "unknown_symbol",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InsufficientHoldings { .. } => "insufficient_holdings",
            LedgerError::QuoteUnavailable(_) => "quote_unavailable",
            LedgerError::ValueOutOfRange(_) => "value_out_of_range",
            LedgerError::Contention { .. } => "contention",
            LedgerError::UsernameTaken(_) => "username_taken",
            LedgerError::InvalidCredentials => "invalid_credentials",
            LedgerError::UnknownAccount(_) => "unknown_account",
            LedgerError::Credential(_) => "credential",
            LedgerError::Store(_) => "store",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::QuoteUnavailable(_) | LedgerError::Contention { .. } | LedgerError::Store(_)
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => LedgerError::UnknownAccount(id),
            StoreError::UsernameTaken(name) => LedgerError::UsernameTaken(name),
            StoreError::ConditionFailed => LedgerError::Contention { attempts: 1 },
            StoreError::OutOfRange(what) => LedgerError::InvalidInput(format!("{what} out of range")),
            other => LedgerError::Store(other),
        }
    }
}

impl From<QuoteError> for LedgerError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::NotFound(symbol) => LedgerError::UnknownSymbol(symbol),
            QuoteError::Unavailable(reason) => LedgerError::QuoteUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_are_terminal() {
        let err = LedgerError::InsufficientHoldings {
            symbol: "BBB".into(),
            requested: 7,
            held: 5,
        };
        assert!(!err.is_transient());
        assert_eq!(err.kind(), "insufficient_holdings");
        assert!(!LedgerError::InvalidCredentials.is_transient());
    }

    #[test]
    fn dependency_failures_are_transient() {
        assert!(LedgerError::QuoteUnavailable("timeout".into()).is_transient());
        assert!(LedgerError::Contention { attempts: 3 }.is_transient());
    }

    #[test]
    fn store_errors_map_to_public_kinds() {
        let id = Uuid::new_v4();
        assert!(matches!(
            LedgerError::from(StoreError::NotFound(id)),
            LedgerError::UnknownAccount(got) if got == id
        ));
        assert!(matches!(
            LedgerError::from(StoreError::OutOfRange("holding")),
            LedgerError::InvalidInput(msg) if msg == "holding out of range"
        ));
        assert!(matches!(
            LedgerError::from(QuoteError::NotFound("ZZZ".into())),
            LedgerError::UnknownSymbol(s) if s == "ZZZ"
        ));
    }
}
