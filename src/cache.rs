//! Short-lived result cache.
//!
//! Entries expire `ttl` after insertion. Expiry is checked on every read,
//! and when a tokio runtime is available each entry also owns an eviction
//! task that drops it from memory on time. `invalidate`, `clear` and drop
//! abort those tasks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    generation: u64,
    eviction: Option<JoinHandle<()>>,
}

impl<V> Entry<V> {
    fn cancel_eviction(&mut self) {
        if let Some(task) = self.eviction.take() {
            task.abort();
        }
    }
}

type Entries<K, V> = Arc<Mutex<HashMap<K, Entry<V>>>>;

pub struct ResultCache<K, V> {
    ttl: Duration,
    entries: Entries<K, V>,
    generation: AtomicU64,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, or `None` when missing or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some(mut entry) = entries.remove(key) {
                entry.cancel_eviction();
            }
        }
        None
    }

    /// Store `value`, replacing any previous entry and its eviction timer.
    pub fn put(&self, key: K, value: V) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let eviction = Handle::try_current()
            .ok()
            .map(|handle| self.spawn_eviction(&handle, key.clone(), generation));

        let previous = self.lock().insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
                generation,
                eviction,
            },
        );
        if let Some(mut previous) = previous {
            previous.cancel_eviction();
        }
    }

    fn spawn_eviction(&self, handle: &Handle, key: K, generation: u64) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        let ttl = self.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(entries) = entries.upgrade() else {
                return;
            };
            let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.get(&key).is_some_and(|e| e.generation == generation) {
                entries.remove(&key);
                tracing::trace!("Cache entry evicted");
            }
        })
    }

    /// Drop `key` after a mutation made it stale.
    pub fn invalidate(&self, key: &K) -> bool {
        match self.lock().remove(key) {
            Some(mut entry) => {
                entry.cancel_eviction();
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        for entry in entries.values_mut() {
            entry.cancel_eviction();
        }
        entries.clear();
    }

    /// Entries held in memory, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Drop for ResultCache<K, V> {
    fn drop(&mut self) {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values() {
            if let Some(task) = &entry.eviction {
                task.abort();
            }
        }
    }
}
