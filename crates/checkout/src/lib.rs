//! Storefront checkout.
//!
//! [`CheckoutOrchestrator`] walks the shopper through
//! address → payment → review → real-payment → complete, keeps one remote
//! order per draft (patching it rather than creating duplicates), quotes
//! shipping, applies coupons and tax, and drives the PayPal, STC Pay, bank
//! transfer and cash-on-delivery sub-protocols.

pub mod cart_access;
pub mod config;
pub mod draft;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod payment;
pub mod phase;
pub mod shipping;

pub use cart_access::CartAccess;
pub use config::CheckoutConfig;
pub use draft::OrderDraft;
pub use error::{CheckoutError, PaymentError, Result};
pub use events::CheckoutEvent;
pub use orchestrator::CheckoutOrchestrator;
pub use payment::{PaymentProgress, PaymentStart, StcOutcome};
pub use phase::CheckoutPhase;
pub use shipping::{QuoteDetails, ShippingState};
