//! Wire types of the storefront REST contract.

use common::{Money, OrderId, ProductId};
use domain::{CartLineItem, GeoPoint, OrderLine, Product, ProductName};
use serde::{Deserialize, Serialize};

/// A line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ProductName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl RemoteCartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price: None,
            sale_price: None,
            name: None,
            image: None,
        }
    }

    /// Converts to a cart line. A sale price wins over the regular one;
    /// a line with no price at all gets zero and is expected to be enriched
    /// from local data.
    pub fn into_line_item(self) -> CartLineItem {
        let price = self.sale_price.or(self.price).unwrap_or_default();
        let mut product = Product::new(self.product_id, "", price);
        product.name = self.name;
        product.image = self.image;
        product.backend_resolvable = Some(true);
        CartLineItem::new(product, self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartListResponse {
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub items: Vec<MergeItem>,
}

/// A local line the merge could not carry over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub product_id: ProductId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeResponse {
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
    #[serde(default)]
    pub skipped: Vec<SkippedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order: Option<OrderRef>,
}

/// Destination sent to the shipping quote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteAddress {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuoteRequest {
    pub address: QuoteAddress,
}

/// Shipping quote as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub ok: bool,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub city_matched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_hours_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_hours_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_days_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_days_max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaypalOrder {
    pub total: Money,
    pub currency: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCreateRequest {
    pub order: PaypalOrder,
    pub local_order_id: Option<OrderId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCreateResponse {
    #[serde(default)]
    pub approval_url: Option<String>,
    #[serde(default)]
    pub paypal_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StcCreateResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StcConfirmRequest {
    pub order_id: OrderId,
    pub session_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StcConfirmResponse {
    pub status: String,
    pub success: bool,
}

/// Account details shown to the shopper for a bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_name: String,
    pub iban: String,
    pub bank: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankInitResponse {
    #[serde(default)]
    pub bank: Option<BankDetails>,
}

/// A proof-of-payment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUploadResponse {
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodEnableResponse {
    pub ok: bool,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub available: Option<u32>,
}
