//! Product data as carried into the cart.

use common::{Locale, Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::pricing::{TierPrice, Tiered, lenient_tiers};

/// Per-locale product name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
}

impl LocalizedName {
    fn get(&self, locale: Locale) -> Option<&str> {
        let value = match locale {
            Locale::Ar => &self.ar,
            Locale::En => &self.en,
            Locale::Fr => &self.fr,
        };
        value.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// A product name as the catalogue sends it: either one string or a
/// per-locale map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductName {
    Plain(String),
    Localized(LocalizedName),
}

impl ProductName {
    /// Resolves the name for `locale`, falling back to Arabic, then English,
    /// then French.
    pub fn resolve(&self, locale: Locale) -> Option<&str> {
        match self {
            ProductName::Plain(name) => Some(name.as_str()).filter(|s| !s.trim().is_empty()),
            ProductName::Localized(names) => names
                .get(locale)
                .or_else(|| names.get(Locale::Ar))
                .or_else(|| names.get(Locale::En))
                .or_else(|| names.get(Locale::Fr)),
        }
    }
}

impl From<&str> for ProductName {
    fn from(name: &str) -> Self {
        ProductName::Plain(name.to_string())
    }
}

/// A catalogue product.
///
/// Only the fields the cart and checkout act on are typed. Everything else
/// the catalogue sends is kept in `extra` and carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,

    #[serde(default, alias = "title", skip_serializing_if = "Option::is_none")]
    pub name: Option<ProductName>,

    /// Base unit price, before any volume tier.
    #[serde(default)]
    pub price: Money,

    #[serde(
        default,
        deserialize_with = "lenient_tiers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tier_prices: Vec<TierPrice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<Money>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Explicit marker that the backend can look this id up. When absent the
    /// checkout falls back to classifying the id by its shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_resolvable: Option<bool>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// Creates a product with just an id, a name and a base price.
    pub fn new(id: impl Into<ProductId>, name: impl Into<ProductName>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            price,
            tier_prices: Vec::new(),
            old_price: None,
            images: Vec::new(),
            image: None,
            stock: None,
            sku: None,
            weight: None,
            brand: None,
            category: None,
            backend_resolvable: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_tiers(mut self, tiers: Vec<TierPrice>) -> Self {
        self.tier_prices = tiers;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.images.insert(0, image.into());
        self
    }

    pub fn with_backend_resolvable(mut self, resolvable: bool) -> Self {
        self.backend_resolvable = Some(resolvable);
        self
    }

    /// Display name for `locale`, or an empty string if the product has none.
    pub fn display_name(&self, locale: Locale) -> &str {
        self.name
            .as_ref()
            .and_then(|name| name.resolve(locale))
            .unwrap_or_default()
    }

    /// The first image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .or(self.image.as_ref())
            .map(String::as_str)
    }
}

impl Tiered for Product {
    fn base_price(&self) -> Money {
        self.price
    }

    fn tier_prices(&self) -> &[TierPrice] {
        &self.tier_prices
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_catalogue_shape_and_keeps_unknown_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "64f1c2a9e3b7d10012ab34cd",
            "name": {"ar": "قهوة", "en": "Coffee"},
            "price": 45,
            "tierPrices": [{"minQty": 3, "price": 40}],
            "images": ["/img/coffee.jpg"],
            "stock": 12,
            "rating": 4.5
        }))
        .unwrap();

        assert_eq!(product.price, Money::from_major(45));
        assert_eq!(product.tier_prices.len(), 1);
        assert_eq!(product.unit_price_for(3), Money::from_major(40));
        assert_eq!(product.extra.get("rating"), Some(&json!(4.5)));
        assert_eq!(product.primary_image(), Some("/img/coffee.jpg"));
    }

    #[test]
    fn title_is_accepted_as_name() {
        let product: Product =
            serde_json::from_value(json!({"id": "p_1", "title": "Mug", "price": 5})).unwrap();
        assert_eq!(product.display_name(Locale::Fr), "Mug");
    }

    #[test]
    fn localized_name_falls_back() {
        let name = ProductName::Localized(LocalizedName {
            ar: Some("كوب".into()),
            en: Some("Cup".into()),
            fr: None,
        });
        assert_eq!(name.resolve(Locale::En), Some("Cup"));
        assert_eq!(name.resolve(Locale::Fr), Some("كوب"));

        let english_only = ProductName::Localized(LocalizedName {
            ar: Some("  ".into()),
            en: Some("Cup".into()),
            fr: None,
        });
        assert_eq!(english_only.resolve(Locale::Ar), Some("Cup"));
    }

    #[test]
    fn missing_name_is_empty() {
        let product: Product = serde_json::from_value(json!({"id": "p_2"})).unwrap();
        assert_eq!(product.display_name(Locale::Ar), "");
        assert!(product.price.is_zero());
    }
}
