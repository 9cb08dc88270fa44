//! Storage keys used by the storefront.

/// Whole-cart snapshot.
pub const CART: &str = "my_store_cart";

/// Checkout shipping address snapshot.
pub const CHECKOUT_ADDRESS: &str = "my_store_checkout_address";

/// Last coupon code the shopper applied.
pub const LAST_COUPON: &str = "my_store_last_coupon";

/// Returns true if `key` can be used by every [`crate::StateStore`]
/// implementation (ASCII alphanumerics, `_`, `-` and `.`, not starting with a dot).
pub fn is_valid(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
