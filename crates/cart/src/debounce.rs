//! Per-key delayed task scheduler.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::lock;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Runs at most one delayed task per key.
///
/// Scheduling a task for a key that already has one waiting aborts the
/// waiting task before the new one is spawned. Once a task's delay has
/// elapsed it leaves the map and runs to completion; later schedules never
/// abort work that is already in flight. Dropping the scheduler aborts
/// everything still waiting.
pub struct DebounceScheduler<K> {
    window: Duration,
    pending: Arc<Mutex<HashMap<K, Pending>>>,
    generation: AtomicU64,
}

impl<K> DebounceScheduler<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedules `task` to run after the window. Returns true if a waiting
    /// task for the same key was superseded.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = lock(&self.pending);

        let superseded = match pending.remove(&key) {
            Some(old) => {
                old.handle.abort();
                true
            }
            None => false,
        };

        let window = self.window;
        let map = Arc::clone(&self.pending);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            {
                let mut pending = lock(&map);
                match pending.get(&task_key) {
                    Some(entry) if entry.generation == generation => {
                        pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            task.await;
        });

        pending.insert(key, Pending { generation, handle });
        superseded
    }

    /// Aborts the waiting task for `key`. Returns true if there was one.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.pending).remove(key) {
            Some(old) => {
                old.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every waiting task.
    pub fn cancel_all(&self) -> usize {
        let mut pending = lock(&self.pending);
        let count = pending.len();
        for (_, old) in pending.drain() {
            old.handle.abort();
        }
        count
    }

    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.pending).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl<K> Drop for DebounceScheduler<K> {
    fn drop(&mut self) {
        for (_, old) in lock(&self.pending).drain() {
            old.handle.abort();
        }
    }
}
