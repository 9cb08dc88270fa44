//! Client-side state persistence.
//!
//! Mirrors what the storefront keeps in browser storage: one opaque JSON
//! blob per key, always written wholesale. There is no cross-process
//! coordination, so two writers of the same key are last-write-wins.

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use error::{Result, StorageError};
pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use snapshot::Snapshot;
pub use store::{StateStore, StateStoreExt};
