//! HTTP error responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::LedgerError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

pub fn status_from_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidInput(_)
        | LedgerError::UnknownSymbol(_)
        | LedgerError::InsufficientFunds { .. }
        | LedgerError::InsufficientHoldings { .. }
        | LedgerError::UsernameTaken(_) => StatusCode::BAD_REQUEST,
        LedgerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LedgerError::UnknownAccount(_) => StatusCode::NOT_FOUND,
        LedgerError::QuoteUnavailable(_) | LedgerError::Contention { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        LedgerError::ValueOutOfRange(_) | LedgerError::Credential(_) | LedgerError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.kind(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message, "kind": self.kind }));
        (self.status, body).into_response()
    }
}
