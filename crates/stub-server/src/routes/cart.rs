//! Signed-in cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use backend::{CartApi, CartListResponse, MergeRequest, MergeResponse, SetQuantityRequest};
use common::ProductId;

use super::{ack, authorize};
use crate::AppState;
use crate::error::ApiError;

/// GET /api/cart
#[tracing::instrument(skip(state, headers))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CartListResponse>, ApiError> {
    authorize(&state, &headers)?;
    let items = state.cart.list().await?;
    Ok(Json(CartListResponse { items }))
}

/// POST /api/cart/set with an absolute quantity.
#[tracing::instrument(skip(state, headers, req), fields(product_id = %req.product_id, quantity = req.quantity))]
pub async fn set(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let result = state.cart.set_quantity(&req.product_id, req.quantity).await;
    if let Err(e) = &result
        && e.is_stock_conflict()
    {
        metrics::counter!("stub_stock_conflicts_total").increment(1);
    }
    result?;
    Ok(ack())
}

/// DELETE /api/cart/item/{id}
#[tracing::instrument(skip(state, headers))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.cart.remove_item(&ProductId::new(id)).await?;
    Ok(ack())
}

/// DELETE /api/cart
#[tracing::instrument(skip(state, headers))]
pub async fn clear(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.cart.clear().await?;
    Ok(ack())
}

/// POST /api/cart/merge
#[tracing::instrument(skip(state, headers, req), fields(count = req.items.len()))]
pub async fn merge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, ApiError> {
    authorize(&state, &headers)?;
    let response = state.cart.merge(req.items).await?;
    if !response.skipped.is_empty() {
        tracing::info!(skipped = response.skipped.len(), "merge skipped lines");
    }
    Ok(Json(response))
}
