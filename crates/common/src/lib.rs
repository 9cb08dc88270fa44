//! Shared identifiers and value types used across the storefront workspace.

pub mod ids;
pub mod money;

pub use ids::{Locale, OrderId, ProductId, UserId};
pub use money::Money;
