use common::{Locale, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::clamp_quantity;
use crate::pricing::{TierPrice, Tiered};
use crate::product::Product;

/// One product line in the cart.
///
/// The unit price is always the tier price for the current quantity; the
/// only way to change the quantity is through methods that re-resolve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedLineItem")]
pub struct CartLineItem {
    product: Product,
    quantity: u32,
    price: Money,
}

#[derive(Deserialize)]
struct PersistedLineItem {
    product: Product,
    quantity: u32,
}

impl From<PersistedLineItem> for CartLineItem {
    fn from(raw: PersistedLineItem) -> Self {
        CartLineItem::new(raw.product, raw.quantity)
    }
}

impl CartLineItem {
    /// Creates a line for `product`, clamping the quantity into range.
    pub fn new(product: Product, quantity: u32) -> Self {
        let quantity = clamp_quantity(quantity);
        let price = product.unit_price_for(quantity);
        Self {
            product,
            quantity,
            price,
        }
    }

    pub fn id(&self) -> &ProductId {
        &self.product.id
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Effective unit price for the current quantity.
    pub fn unit_price(&self) -> Money {
        self.price
    }

    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    pub fn name(&self, locale: Locale) -> &str {
        self.product.display_name(locale)
    }

    /// Sets the quantity (clamped) and re-resolves the unit price.
    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = clamp_quantity(quantity);
        self.price = self.product.unit_price_for(self.quantity);
    }

    /// Replaces the product data, keeping the quantity.
    pub(crate) fn refresh_product(&mut self, product: Product) {
        self.product = product;
        self.price = self.product.unit_price_for(self.quantity);
    }
}

impl Tiered for CartLineItem {
    fn base_price(&self) -> Money {
        self.product.price
    }

    fn tier_prices(&self) -> &[TierPrice] {
        &self.product.tier_prices
    }
}
