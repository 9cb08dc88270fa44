//! Pure checkout building blocks: address validation, coupons, totals and
//! order payload assembly.

mod address;
mod coupon;
mod order;
mod totals;

pub use address::{AddressErrors, AddressField, FieldError, GeoPoint, ShippingAddress};
pub use coupon::{AppliedCoupon, CouponBook, CouponRule};
pub use order::{
    OrderContext, OrderLine, OrderLineName, OrderPatch, OrderPayload, OrderProductRef,
    PaymentMeta, PaymentMethod, ProductIdPolicy,
};
pub use totals::{OrderTotals, TAX_RATE_PERCENT};
