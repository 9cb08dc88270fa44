//! Storefront cart store.
//!
//! [`CartStore`] owns the shopper's cart. Every mutation is applied to local
//! state first and persisted wholesale; the signed-in user's server cart is
//! then brought in line with absolute quantities. Quantity edits are
//! debounced per product so press-and-hold controls only send their final
//! value.

pub mod config;
pub mod debounce;
pub mod error;
pub mod session;
pub mod store;

pub use config::CartConfig;
pub use debounce::DebounceScheduler;
pub use error::{CartError, Result};
pub use session::Session;
pub use store::{CartStore, CartView, MergeReport};

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
