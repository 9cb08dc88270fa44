//! Shipping quote endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use backend::{ShippingApi, ShippingQuote, ShippingQuoteRequest};

use crate::AppState;
use crate::error::ApiError;

/// POST /api/shipping/quote
#[tracing::instrument(skip(state, req), fields(city = %req.address.city))]
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShippingQuoteRequest>,
) -> Result<Json<ShippingQuote>, ApiError> {
    let quote = state.shipping.quote(&req).await?;
    Ok(Json(quote))
}
