//! Domain layer for the storefront cart and checkout core.
//!
//! Everything here is synchronous and side-effect free:
//! - tiered unit price resolution
//! - cart line items and the cart collection, including the login-time merge
//! - shipping address validation
//! - coupon rules, totals and tax
//! - order payload assembly
//! - cart domain events consumed by the UI layer

pub mod cart;
pub mod checkout;
pub mod error;
pub mod events;
pub mod pricing;
pub mod product;

pub use cart::{
    AddKind, AddOutcome, Cart, CartLineItem, MAX_PER_ITEM, QuantityChange, adopt_remote, merge_max,
};
pub use checkout::{
    AddressErrors, AddressField, AppliedCoupon, CouponBook, CouponRule, FieldError, GeoPoint,
    OrderContext, OrderLine, OrderLineName, OrderPatch, OrderPayload, OrderProductRef,
    OrderTotals, PaymentMeta, PaymentMethod, ProductIdPolicy, ShippingAddress, TAX_RATE_PERCENT,
};
pub use error::DomainError;
pub use events::{
    AuthRequiredData, CartEvent, DomainEvent, ItemAddedData, MergeSkippedData, OldCartData,
    StockConflictData, SyncFailedData,
};
pub use pricing::{TierPrice, Tiered, select_tier_unit};
pub use product::{LocalizedName, Product, ProductName};
