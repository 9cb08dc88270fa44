//! Order create and patch endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use backend::{CreateOrderResponse, OrderApi, OrderRef};
use common::OrderId;
use domain::{OrderPatch, OrderPayload};

use super::ack;
use crate::AppState;
use crate::error::ApiError;

/// POST /api/orders
#[tracing::instrument(skip(state, payload), fields(items = payload.items.len(), method = %payload.payment_method))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let id = state.orders.create(&payload).await?;
    metrics::counter!("stub_orders_created_total").increment(1);
    tracing::info!(order_id = %id, "order created");
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order: Some(OrderRef { id }),
        }),
    ))
}

/// PATCH /api/orders/{id}
#[tracing::instrument(skip(state, patch))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.orders.patch(&OrderId::new(id), &patch).await?;
    Ok(ack())
}
