//! Client side of the storefront REST contract.
//!
//! Each backend concern is a trait (`CartApi`, `OrderApi`, `ShippingApi`,
//! `PaymentApi`) with two implementations: an in-memory fake used in tests and
//! by the development stub server, and [`HttpBackend`] which talks to a real
//! backend with reqwest.

pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod idempotency;
pub mod orders;
pub mod payments;
pub mod shipping;
pub mod types;

pub use cart::{CartApi, CartCall, InMemoryCartApi};
pub use config::BackendConfig;
pub use error::{BackendError, Result};
pub use http::HttpBackend;
pub use idempotency::IdempotencyKey;
pub use orders::{InMemoryOrderApi, OrderApi, StoredOrder};
pub use payments::{InMemoryPaymentApi, PaymentApi, PaymentCall, PaymentOp};
pub use shipping::{DistanceShippingQuoter, ShippingApi};
pub use types::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a fake's state, recovering it if a panicking test poisoned the lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
