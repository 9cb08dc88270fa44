use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Result, Snapshot, StateStore, StorageError, keys};

/// In-memory state store for testing.
///
/// Clones share the same underlying map, the way every component in a
/// single browser tab shares one storage area.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStateStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }

    /// Returns how many times `save` has been called.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Clears all snapshots.
    pub async fn clear(&self) {
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, key: &str) -> Result<Option<Snapshot>> {
        if !keys::is_valid(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.snapshots.read().await.get(key).cloned())
    }

    async fn save(&self, snapshot: Snapshot) -> Result<()> {
        if !keys::is_valid(&snapshot.key) {
            return Err(StorageError::InvalidKey(snapshot.key));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .write()
            .await
            .insert(snapshot.key.clone(), snapshot);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if !keys::is_valid(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.snapshots.write().await.remove(key);
        Ok(())
    }
}
