//! Tiered unit price resolution.

use common::Money;
use serde::{Deserialize, Deserializer, Serialize};

/// A volume price tier: buying at least `min_qty` units costs `price` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPrice {
    pub min_qty: u32,
    pub price: Money,
}

impl TierPrice {
    pub fn new(min_qty: u32, price: Money) -> Self {
        Self { min_qty, price }
    }
}

/// Anything that carries a base price and optional volume tiers.
pub trait Tiered {
    fn base_price(&self) -> Money;

    fn tier_prices(&self) -> &[TierPrice];

    /// Effective unit price when buying `quantity` units.
    fn unit_price_for(&self, quantity: u32) -> Money {
        select_tier_unit(self.base_price(), self.tier_prices(), quantity)
    }
}

/// Resolves the unit price for `quantity` against a tier list.
///
/// Tiers are considered in ascending `min_qty` order regardless of the order
/// they are given in. The result is the price of the last tier whose
/// `min_qty` the quantity meets, or `base` when none qualifies.
pub fn select_tier_unit(base: Money, tiers: &[TierPrice], quantity: u32) -> Money {
    if tiers.is_empty() {
        return base;
    }

    let mut sorted = tiers.to_vec();
    sorted.sort_by_key(|tier| tier.min_qty);

    let mut unit = base;
    for tier in &sorted {
        if tier.min_qty > quantity {
            break;
        }
        unit = tier.price;
    }
    unit
}

/// Deserializes a tier list, treating anything that is not an array as "no
/// tiers" and skipping entries that do not parse.
pub fn lenient_tiers<'de, D>(deserializer: D) -> Result<Vec<TierPrice>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}
