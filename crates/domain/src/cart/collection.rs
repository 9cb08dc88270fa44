use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use super::{CartLineItem, MAX_PER_ITEM};
use crate::error::DomainError;
use crate::product::Product;

/// Whether an add created a line or grew an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddKind {
    New,
    Increment,
}

/// Result of [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    pub kind: AddKind,
    /// The resulting line quantity.
    pub quantity: u32,
    pub unit_price: Money,
}

/// Result of a quantity change on an existing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated { quantity: u32, unit_price: Money },
    Removed,
}

/// The cart: an ordered set of lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLineItem>", into = "Vec<CartLineItem>")]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl From<Vec<CartLineItem>> for Cart {
    fn from(items: Vec<CartLineItem>) -> Self {
        Cart::hydrate(items)
    }
}

impl From<Cart> for Vec<CartLineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from possibly duplicated lines, e.g. a persisted snapshot
    /// written by an older client. Duplicates are folded into the first
    /// occurrence with their quantities summed and capped.
    pub fn hydrate(lines: impl IntoIterator<Item = CartLineItem>) -> Self {
        let mut cart = Cart::new();
        for line in lines {
            match cart.position(line.id()) {
                Some(index) => {
                    let existing = &mut cart.items[index];
                    let summed = existing.quantity().saturating_add(line.quantity());
                    existing.set_quantity(summed.min(MAX_PER_ITEM));
                }
                None => cart.items.push(line),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.id() == id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line quantities.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(CartLineItem::quantity).sum()
    }

    /// Sum of effective line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Adds `quantity` units of `product`.
    ///
    /// An existing line grows to `min(MAX_PER_ITEM, current + quantity)` and
    /// takes the incoming product data. The unit price is resolved for the
    /// resulting quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<AddOutcome, DomainError> {
        if product.id.is_blank() {
            return Err(DomainError::InvalidProduct);
        }
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let (kind, line) = match self.position(&product.id) {
            Some(index) => {
                let line = &mut self.items[index];
                let next = line.quantity().saturating_add(quantity).min(MAX_PER_ITEM);
                line.refresh_product(product.clone());
                line.set_quantity(next);
                (AddKind::Increment, &self.items[index])
            }
            None => {
                self.items.push(CartLineItem::new(product.clone(), quantity));
                let last = self.items.len() - 1;
                (AddKind::New, &self.items[last])
            }
        };

        Ok(AddOutcome {
            kind,
            quantity: line.quantity(),
            unit_price: line.unit_price(),
        })
    }

    /// Sets an absolute quantity. Zero removes the line.
    pub fn set_quantity(
        &mut self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<QuantityChange, DomainError> {
        let index = self
            .position(id)
            .ok_or_else(|| DomainError::ItemNotFound {
                product_id: id.clone(),
            })?;

        if quantity == 0 {
            self.items.remove(index);
            return Ok(QuantityChange::Removed);
        }

        let line = &mut self.items[index];
        line.set_quantity(quantity);
        Ok(QuantityChange::Updated {
            quantity: line.quantity(),
            unit_price: line.unit_price(),
        })
    }

    /// Rolls a line back after the backend reported only `available` units.
    ///
    /// The target is `min(reference, available)`, where `reference` is the
    /// quantity the caller captured when it issued the request. Returns
    /// `None` if the line is already gone.
    pub fn apply_stock_limit(
        &mut self,
        id: &ProductId,
        available: u32,
        reference: u32,
    ) -> Option<QuantityChange> {
        let target = reference.min(available);
        self.set_quantity(id, target).ok()
    }

    /// Removes a line, returning it if it existed.
    pub fn remove(&mut self, id: &ProductId) -> Option<CartLineItem> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Absolute quantities per product, as sent to the merge endpoint.
    pub fn quantities(&self) -> impl Iterator<Item = (&ProductId, u32)> {
        self.items.iter().map(|line| (line.id(), line.quantity()))
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|line| line.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::TierPrice;

    fn tiered() -> Product {
        Product::new("p_tiered", "Tea", Money::from_major(10)).with_tiers(vec![
            TierPrice::new(1, Money::from_major(10)),
            TierPrice::new(5, Money::from_major(8)),
        ])
    }

    #[test]
    fn tiered_add_reaches_discount_at_min_qty() {
        let mut cart = Cart::new();
        let first = cart.add(&tiered(), 1).unwrap();
        assert_eq!(first.kind, AddKind::New);
        assert_eq!(first.quantity, 1);
        assert_eq!(first.unit_price, Money::from_major(10));

        let second = cart.add(&tiered(), 4).unwrap();
        assert_eq!(second.kind, AddKind::Increment);
        assert_eq!(second.quantity, 5);
        assert_eq!(second.unit_price, Money::from_major(8));
        assert_eq!(cart.subtotal(), Money::from_major(40));
    }

    #[test]
    fn increment_is_clamped() {
        let mut cart = Cart::new();
        cart.add(&tiered(), 8).unwrap();
        let outcome = cart.add(&tiered(), 8).unwrap();
        assert_eq!(outcome.quantity, MAX_PER_ITEM);
    }

    #[test]
    fn add_rejects_blank_id_and_zero_quantity() {
        let mut cart = Cart::new();
        let nameless = Product::new(" ", "x", Money::from_major(1));
        assert_eq!(cart.add(&nameless, 1), Err(DomainError::InvalidProduct));
        assert_eq!(
            cart.add(&tiered(), 0),
            Err(DomainError::InvalidQuantity { quantity: 0 })
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn quantity_stays_in_range_under_any_sequence() {
        let mut cart = Cart::new();
        let id = ProductId::new("p_tiered");
        let steps: [(bool, u32); 8] = [
            (true, 3),
            (false, 25),
            (true, 9),
            (false, 1),
            (false, 7),
            (true, 10),
            (false, 0),
            (true, 2),
        ];
        for (is_add, amount) in steps {
            if is_add {
                cart.add(&tiered(), amount).unwrap();
            } else if cart.contains(&id) {
                cart.set_quantity(&id, amount).unwrap();
            }
            if let Some(line) = cart.get(&id) {
                assert!((1..=MAX_PER_ITEM).contains(&line.quantity()));
                assert_eq!(
                    line.unit_price(),
                    crate::pricing::Tiered::unit_price_for(line, line.quantity())
                );
            }
        }
        assert_eq!(cart.get(&id).map(CartLineItem::quantity), Some(2));
    }

    #[test]
    fn set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(&tiered(), 2).unwrap();
        let id = ProductId::new("p_tiered");
        assert_eq!(cart.set_quantity(&id, 0), Ok(QuantityChange::Removed));
        assert!(cart.is_empty());
        assert!(matches!(
            cart.set_quantity(&id, 1),
            Err(DomainError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn stock_limit_uses_reference_quantity() {
        let mut cart = Cart::new();
        cart.add(&tiered(), 7).unwrap();
        let id = ProductId::new("p_tiered");

        let change = cart.apply_stock_limit(&id, 3, 7);
        assert_eq!(
            change,
            Some(QuantityChange::Updated {
                quantity: 3,
                unit_price: Money::from_major(10)
            })
        );

        assert_eq!(cart.apply_stock_limit(&id, 0, 3), Some(QuantityChange::Removed));
        assert_eq!(cart.apply_stock_limit(&id, 5, 5), None);
    }

    #[test]
    fn hydrate_folds_duplicates() {
        let lines = vec![
            CartLineItem::new(tiered(), 6),
            CartLineItem::new(Product::new("p_other", "Cup", Money::from_major(3)), 1),
            CartLineItem::new(tiered(), 6),
        ];
        let cart = Cart::hydrate(lines);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.items()[0].quantity(), MAX_PER_ITEM);
        assert_eq!(cart.items()[1].id().as_str(), "p_other");
    }

    #[test]
    fn cart_serializes_as_plain_list() {
        let mut cart = Cart::new();
        cart.add(&tiered(), 2).unwrap();
        let value = serde_json::to_value(&cart).unwrap();
        assert!(value.is_array());
        let back: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(back, cart);
    }
}
