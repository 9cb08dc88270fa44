use common::{Locale, Money, ProductId, UserId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{AppliedCoupon, OrderTotals, ShippingAddress};
use crate::cart::{Cart, CartLineItem};

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Paypal,
    Stc,
    Bank,
    Cod,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Paypal,
        PaymentMethod::Stc,
        PaymentMethod::Bank,
        PaymentMethod::Cod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Stc => "stc",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown payment method: {s}"))
    }
}

/// Decides whether a cart line's product id can be sent to the backend as-is.
///
/// An explicit `backend_resolvable` flag on the product always wins. Without
/// one, ids that start with a local prefix or are shorter than
/// `min_backend_len` are treated as local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdPolicy {
    pub local_prefixes: Vec<String>,
    pub min_backend_len: usize,
}

impl Default for ProductIdPolicy {
    fn default() -> Self {
        Self {
            local_prefixes: vec!["p_".to_string()],
            min_backend_len: 11,
        }
    }
}

impl ProductIdPolicy {
    pub fn is_backend_resolvable(&self, line: &CartLineItem) -> bool {
        if let Some(flag) = line.product().backend_resolvable {
            return flag;
        }
        self.looks_like_backend_id(line.id())
    }

    pub fn looks_like_backend_id(&self, id: &ProductId) -> bool {
        let id = id.as_str();
        id.chars().count() >= self.min_backend_len
            && !self.local_prefixes.iter().any(|p| id.starts_with(p.as_str()))
    }
}

/// Product reference on an order line: a backend id or the `custom` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderProductRef {
    Backend(ProductId),
    Custom,
}

impl OrderProductRef {
    pub const CUSTOM: &'static str = "custom";

    pub fn as_str(&self) -> &str {
        match self {
            OrderProductRef::Backend(id) => id.as_str(),
            OrderProductRef::Custom => Self::CUSTOM,
        }
    }
}

impl Serialize for OrderProductRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderProductRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == Self::CUSTOM {
            Ok(OrderProductRef::Custom)
        } else {
            Ok(OrderProductRef::Backend(ProductId::new(raw)))
        }
    }
}

/// Arabic/English name pair sent with each order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineName {
    pub ar: String,
    pub en: String,
}

impl OrderLineName {
    fn for_line(line: &CartLineItem) -> Self {
        let product = line.product();
        let named = |locale, fallback: &str| {
            let name = product.display_name(locale);
            if name.is_empty() {
                fallback.to_string()
            } else {
                name.to_string()
            }
        };
        Self {
            ar: named(Locale::Ar, "صنف"),
            en: named(Locale::En, "Item"),
        }
    }
}

/// One line of an order payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: OrderProductRef,
    pub name: OrderLineName,
    pub price: Money,
    pub quantity: u32,
    pub old_price: Option<Money>,
}

impl OrderLine {
    pub fn from_cart_line(line: &CartLineItem, policy: &ProductIdPolicy) -> Self {
        let product_id = if policy.is_backend_resolvable(line) {
            OrderProductRef::Backend(line.id().clone())
        } else {
            OrderProductRef::Custom
        };
        Self {
            product_id,
            name: OrderLineName::for_line(line),
            price: line.unit_price(),
            quantity: line.quantity(),
            old_price: line.product().old_price,
        }
    }
}

/// Checkout details attached to the order alongside the payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMeta {
    pub address: ShippingAddress,
    pub coupon: Option<String>,
    pub shipping: Money,
}

/// Everything needed to assemble an order payload from a draft.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    pub user: Option<&'a UserId>,
    pub cart: &'a Cart,
    pub policy: &'a ProductIdPolicy,
    pub currency: &'a str,
    pub payment_method: PaymentMethod,
    pub address: &'a ShippingAddress,
    pub coupon: Option<&'a AppliedCoupon>,
    pub totals: &'a OrderTotals,
}

/// Body of the create-order call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub user_id: String,
    pub items: Vec<OrderLine>,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_meta: PaymentMeta,
    pub discount: Money,
    pub tax: Money,
}

impl OrderPayload {
    pub const GUEST: &'static str = "guest";

    pub fn build(ctx: &OrderContext<'_>) -> Self {
        Self {
            user_id: ctx
                .user
                .map(|u| u.to_string())
                .unwrap_or_else(|| Self::GUEST.to_string()),
            items: ctx
                .cart
                .items()
                .iter()
                .map(|line| OrderLine::from_cart_line(line, ctx.policy))
                .collect(),
            currency: ctx.currency.to_string(),
            payment_method: ctx.payment_method,
            payment_meta: PaymentMeta {
                address: ctx.address.clone(),
                coupon: ctx.coupon.map(|c| c.code.clone()),
                shipping: ctx.totals.shipping,
            },
            discount: ctx.totals.discount,
            tax: ctx.totals.tax,
        }
    }

    /// The subset of the payload sent when updating an existing order.
    pub fn to_patch(&self) -> OrderPatch {
        OrderPatch {
            items: self.items.clone(),
            payment_method: self.payment_method,
            payment_meta: self.payment_meta.clone(),
        }
    }
}

/// Body of the update-order call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    pub payment_meta: PaymentMeta,
}
