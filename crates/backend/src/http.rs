//! reqwest implementation of the backend traits.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{OrderId, ProductId};
use domain::{OrderPatch, OrderPayload};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::cart::CartApi;
use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::idempotency::IdempotencyKey;
use crate::orders::OrderApi;
use crate::payments::PaymentApi;
use crate::shipping::ShippingApi;
use crate::types::{
    BankInitResponse, CartListResponse, CreateOrderResponse, ErrorBody, MergeItem, MergeRequest,
    MergeResponse, OrderIdRequest, PaypalCreateRequest, PaypalCreateResponse, ReceiptFile,
    ReceiptUploadResponse, RemoteCartItem, SetQuantityRequest, ShippingQuote,
    ShippingQuoteRequest, StcConfirmRequest, StcConfirmResponse, StcCreateResponse,
};

/// HTTP client for the storefront backend.
///
/// Cheap to clone; clones share the connection pool and the access token.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: String,
    access_token: RwLock<Option<SecretString>>,
}

impl HttpBackend {
    /// Builds a client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                access_token: RwLock::new(config.access_token.clone()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Replaces the bearer token, e.g. after sign-in or sign-out.
    pub fn set_access_token(&self, token: Option<SecretString>) {
        *self
            .inner
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn has_access_token(&self) -> bool {
        self.inner
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        let token = self
            .inner
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.expose_secret().to_string());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn keyed(&self, path: &str, key: &IdempotencyKey) -> RequestBuilder {
        self.request(Method::POST, path)
            .header(IdempotencyKey::HEADER, key.as_str())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    async fn send_ignoring_body(&self, builder: RequestBuilder) -> Result<()> {
        let response = builder.send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Passes 2xx responses through and maps everything else to a
/// [`BackendError`], recognising the structured stock-conflict body.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    tracing::debug!(status = status.as_u16(), code = ?body.error, "backend error response");

    if body.error.as_deref() == Some("INSUFFICIENT_STOCK") {
        return Err(BackendError::InsufficientStock {
            available: body.available.unwrap_or(0),
        });
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthenticated);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound {
            resource: body.error.unwrap_or_else(|| "resource".to_string()),
        });
    }
    Err(BackendError::Status {
        status: status.as_u16(),
        message: body.message.or_else(|| body.error.clone()).unwrap_or(text),
        code: body.error,
    })
}

fn encode_segment(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[async_trait]
impl CartApi for HttpBackend {
    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<RemoteCartItem>> {
        let response: CartListResponse = self.send(self.request(Method::GET, "/cart")).await?;
        Ok(response.items)
    }

    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let body = SetQuantityRequest {
            product_id: product_id.clone(),
            quantity,
        };
        self.send_ignoring_body(self.request(Method::POST, "/cart/set").json(&body))
            .await
    }

    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: &ProductId) -> Result<()> {
        let path = format!("/cart/item/{}", encode_segment(product_id.as_str()));
        self.send_ignoring_body(self.request(Method::DELETE, &path))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.send_ignoring_body(self.request(Method::DELETE, "/cart"))
            .await
    }

    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    async fn merge(&self, items: Vec<MergeItem>) -> Result<MergeResponse> {
        let body = MergeRequest { items };
        self.send(self.request(Method::POST, "/cart/merge").json(&body))
            .await
    }

    fn set_credential(&self, credential: Option<SecretString>) {
        self.set_access_token(credential);
    }
}

#[async_trait]
impl OrderApi for HttpBackend {
    #[tracing::instrument(skip(self, payload), fields(items = payload.items.len()))]
    async fn create(&self, payload: &OrderPayload) -> Result<OrderId> {
        let response: CreateOrderResponse = self
            .send(self.request(Method::POST, "/orders").json(payload))
            .await?;
        response
            .order
            .map(|order| order.id)
            .ok_or_else(|| BackendError::InvalidResponse("create order returned no id".into()))
    }

    #[tracing::instrument(skip(self, patch), fields(order_id = %order_id))]
    async fn patch(&self, order_id: &OrderId, patch: &OrderPatch) -> Result<()> {
        let path = format!("/orders/{}", encode_segment(order_id.as_str()));
        self.send_ignoring_body(self.request(Method::PATCH, &path).json(patch))
            .await
    }
}

#[async_trait]
impl ShippingApi for HttpBackend {
    #[tracing::instrument(skip(self, request), fields(city = %request.address.city))]
    async fn quote(&self, request: &ShippingQuoteRequest) -> Result<ShippingQuote> {
        self.send(self.request(Method::POST, "/shipping/quote").json(request))
            .await
    }
}

#[async_trait]
impl PaymentApi for HttpBackend {
    #[tracing::instrument(skip(self, request, key), fields(key = %key))]
    async fn paypal_create(
        &self,
        request: &PaypalCreateRequest,
        key: &IdempotencyKey,
    ) -> Result<PaypalCreateResponse> {
        self.send(self.keyed("/pay/paypal/create-order", key).json(request))
            .await
    }

    #[tracing::instrument(skip(self, key), fields(order_id = %order_id, key = %key))]
    async fn stc_create(
        &self,
        order_id: &OrderId,
        key: &IdempotencyKey,
    ) -> Result<StcCreateResponse> {
        let body = OrderIdRequest {
            order_id: order_id.clone(),
        };
        self.send(self.keyed("/pay/stc/create", key).json(&body))
            .await
    }

    #[tracing::instrument(skip(self, request, key), fields(order_id = %request.order_id, key = %key))]
    async fn stc_confirm(
        &self,
        request: &StcConfirmRequest,
        key: &IdempotencyKey,
    ) -> Result<StcConfirmResponse> {
        self.send(self.keyed("/pay/stc/confirm", key).json(request))
            .await
    }

    #[tracing::instrument(skip(self, key), fields(order_id = %order_id, key = %key))]
    async fn bank_init(
        &self,
        order_id: &OrderId,
        key: &IdempotencyKey,
    ) -> Result<BankInitResponse> {
        let body = OrderIdRequest {
            order_id: order_id.clone(),
        };
        self.send(self.keyed("/pay/bank/init", key).json(&body))
            .await
    }

    #[tracing::instrument(skip(self, receipt, key), fields(order_id = %order_id, key = %key))]
    async fn bank_upload_receipt(
        &self,
        order_id: &OrderId,
        receipt: ReceiptFile,
        key: &IdempotencyKey,
    ) -> Result<ReceiptUploadResponse> {
        let part = reqwest::multipart::Part::bytes(receipt.bytes)
            .file_name(receipt.file_name)
            .mime_str(&receipt.content_type)?;
        let form = reqwest::multipart::Form::new()
            .text("orderId", order_id.to_string())
            .part("receipt", part);
        self.send(self.keyed("/pay/bank/upload", key).multipart(form))
            .await
    }

    #[tracing::instrument(skip(self, key), fields(order_id = %order_id, key = %key))]
    async fn cod_enable(&self, order_id: &OrderId, key: &IdempotencyKey) -> Result<()> {
        let body = OrderIdRequest {
            order_id: order_id.clone(),
        };
        self.send_ignoring_body(self.keyed("/pay/cod/enable", key).json(&body))
            .await
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_segment("clx_12-ab.c~"), "clx_12-ab.c~");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn base_url_is_normalized_and_token_replaceable() {
        let backend = HttpBackend::new(&BackendConfig::with_base_url("http://localhost:9/api/"))
            .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:9/api");
        assert!(!backend.has_access_token());

        backend.set_access_token(Some(SecretString::from("t".to_string())));
        assert!(backend.has_access_token());
    }
}
