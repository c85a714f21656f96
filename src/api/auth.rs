//! JWT bearer auth and the account endpoints (register, login, password change).

use axum::{
    Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::error::LedgerError;

/// JWT claims: `sub` = account id (Uuid as string), `exp` (expiry), `iat` (issued at).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated account extracted from JWT Bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
}

const JWT_EXPIRY_HOURS: i64 = 24;

impl Claims {
    pub fn new(account_id: Uuid) -> Self {
        let now = chrono::Utc::now();
        let exp = (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp();
        Self {
            sub: account_id.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(secret: &[u8], account_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(account_id);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token(secret: &[u8], token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(token_data.claims)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
        let claims = decode_token(&state.jwt_secret, token)
            .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;
        let account_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::unauthorized("invalid token subject"))?;
        Ok(AuthUser { account_id })
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Repeated password. Checked only when sent.
    #[serde(default)]
    pub confirmation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub confirmation: Option<String>,
}

fn check_confirmation(password: &str, confirmation: Option<&str>) -> Result<(), LedgerError> {
    match confirmation {
        Some(c) if c != password => Err(LedgerError::InvalidInput("passwords do not match".into())),
        _ => Ok(()),
    }
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = payload?;
    check_confirmation(&req.password, req.confirmation.as_deref())?;
    let account = state.engine.register(&req.username, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": account.id,
            "username": account.username,
            "cash": account.cash,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let account = state.engine.authenticate(&req.username, &req.password).await?;
    let token = create_token(&state.jwt_secret, account.id)
        .map_err(|e| ApiError::internal(format!("token signing failed: {e}")))?;
    Ok(Json(json!({ "token": token, "user_id": account.id })))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    check_confirmation(&req.new_password, req.confirmation.as_deref())?;
    state
        .engine
        .change_secret(user.account_id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
