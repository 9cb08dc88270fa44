//! Payment provider endpoints. Every call must carry an idempotency key;
//! a repeated key replays the first response.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use backend::{
    BankInitResponse, CodEnableResponse, OrderIdRequest, PaymentApi, PaypalCreateRequest,
    PaypalCreateResponse, ReceiptFile, ReceiptUploadResponse, StcConfirmRequest,
    StcConfirmResponse, StcCreateResponse,
};
use common::OrderId;

use super::idempotency_key;
use crate::AppState;
use crate::error::ApiError;

fn count(op: &'static str) {
    metrics::counter!("stub_payment_calls_total", "op" => op).increment(1);
}

/// POST /api/pay/paypal/create-order
#[tracing::instrument(skip_all)]
pub async fn paypal_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PaypalCreateRequest>,
) -> Result<Json<PaypalCreateResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    count("paypal_create");
    Ok(Json(state.payments.paypal_create(&req, &key).await?))
}

/// POST /api/pay/stc/create
#[tracing::instrument(skip_all, fields(order_id = %req.order_id))]
pub async fn stc_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderIdRequest>,
) -> Result<Json<StcCreateResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    count("stc_create");
    Ok(Json(state.payments.stc_create(&req.order_id, &key).await?))
}

/// POST /api/pay/stc/confirm
#[tracing::instrument(skip_all, fields(order_id = %req.order_id, success = req.success))]
pub async fn stc_confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<StcConfirmRequest>,
) -> Result<Json<StcConfirmResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    count("stc_confirm");
    Ok(Json(state.payments.stc_confirm(&req, &key).await?))
}

/// POST /api/pay/bank/init
#[tracing::instrument(skip_all, fields(order_id = %req.order_id))]
pub async fn bank_init(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderIdRequest>,
) -> Result<Json<BankInitResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    count("bank_init");
    Ok(Json(state.payments.bank_init(&req.order_id, &key).await?))
}

/// POST /api/pay/bank/upload, multipart with an `orderId` field and a
/// `receipt` file.
#[tracing::instrument(skip_all)]
pub async fn bank_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ReceiptUploadResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.to_string());

    let mut order_id = None;
    let mut receipt = None;
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("orderId") => order_id = Some(OrderId::new(field.text().await.map_err(bad)?)),
            Some("receipt") => {
                let file_name = field.file_name().unwrap_or("receipt").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad)?;
                receipt = Some(ReceiptFile::new(file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let order_id = order_id.ok_or_else(|| ApiError::BadRequest("missing orderId".to_string()))?;
    let receipt = receipt
        .filter(|r| !r.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing receipt file".to_string()))?;

    count("bank_upload");
    tracing::info!(order_id = %order_id, file = %receipt.file_name, "receipt received");
    Ok(Json(
        state
            .payments
            .bank_upload_receipt(&order_id, receipt, &key)
            .await?,
    ))
}

/// POST /api/pay/cod/enable
#[tracing::instrument(skip_all, fields(order_id = %req.order_id))]
pub async fn cod_enable(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OrderIdRequest>,
) -> Result<Json<CodEnableResponse>, ApiError> {
    let key = idempotency_key(&headers)?;
    count("cod_enable");
    state.payments.cod_enable(&req.order_id, &key).await?;
    Ok(Json(CodEnableResponse { ok: true }))
}
