pub mod cart;
pub mod ops;
pub mod orders;
pub mod payments;
pub mod shipping;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use backend::IdempotencyKey;

use crate::AppState;
use crate::error::ApiError;

/// Rejects the call unless it carries a bearer token (when auth is on).
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if !state.require_auth {
        return Ok(());
    }
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if bearer { Ok(()) } else { Err(ApiError::Unauthorized) }
}

/// Reads the idempotency key every payment call must carry.
fn idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, ApiError> {
    headers
        .get(IdempotencyKey::HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(IdempotencyKey::from_raw)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {} header", IdempotencyKey::HEADER)))
}

/// Body of successful calls that return nothing else.
fn ack() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true }))
}
