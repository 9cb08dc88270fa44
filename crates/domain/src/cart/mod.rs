//! Cart line items and the cart collection.

mod collection;
mod line_item;
mod merge;

pub use collection::{AddKind, AddOutcome, Cart, QuantityChange};
pub use line_item::CartLineItem;
pub use merge::{adopt_remote, merge_max};

/// Upper bound on the quantity of a single cart line.
pub const MAX_PER_ITEM: u32 = 10;

/// Clamps a positive quantity into `[1, MAX_PER_ITEM]`.
pub(crate) fn clamp_quantity(quantity: u32) -> u32 {
    quantity.clamp(1, MAX_PER_ITEM)
}
