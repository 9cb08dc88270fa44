use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Result, Snapshot};

/// Core trait for client state persistence.
///
/// Implementations hold one snapshot per key and must be thread-safe.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the snapshot stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Snapshot>>;

    /// Stores a snapshot, replacing whatever was under the same key.
    async fn save(&self, snapshot: Snapshot) -> Result<()>;

    /// Removes the snapshot stored under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Typed helpers on top of [`StateStore`].
#[async_trait]
pub trait StateStoreExt: StateStore {
    /// Loads and deserializes the state under `key`.
    async fn load_state<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.load(key).await? {
            Some(snapshot) => Ok(Some(snapshot.into_state()?)),
            None => Ok(None),
        }
    }

    /// Serializes `state` and stores it under `key`.
    async fn save_state<T>(&self, key: &str, state: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let snapshot = Snapshot::from_state(key, state)?;
        self.save(snapshot).await
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

