//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::checkout::AddressErrors;

/// Errors that can occur during domain operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// The product has no usable identifier.
    #[error("Invalid product: missing id")]
    InvalidProduct,

    /// A quantity that cannot be applied to a cart line.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    /// The cart has no line for this product.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// The shipping address failed validation.
    #[error("Invalid shipping address: {0}")]
    InvalidAddress(AddressErrors),
}
