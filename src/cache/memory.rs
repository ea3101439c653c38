//! In-process TTL cache backend.
//!
//! Entries live in a process-local map; each insert schedules a cancellable
//! tokio eviction task for the entry's deadline. Every mutation keeps the map
//! and the eviction bookkeeping consistent: no entry exists without a live,
//! correctly-targeted pending eviction, and a stale eviction task firing for
//! a replaced entry is a harmless no-op.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{CacheBackend, CacheConfig, namespaced_key, validate_entry};
use crate::error::CacheError;

/// One cached key with its deadline and scheduled eviction.
struct Entry {
    /// When this entry stops counting as present.
    expires_at: Instant,
    /// Distinguishes this entry from a replaced one under the same key, so a
    /// stale eviction task never removes a fresh entry.
    generation: u64,
    /// The scheduled eviction task; aborted on overwrite, delete and clear.
    reaper: JoinHandle<()>,
}

/// Keyed store shared between the cache and its eviction tasks.
#[derive(Default)]
struct Store {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

impl Store {
    /// Removes an entry and cancels its eviction task.
    fn evict(&mut self, key: &str) -> bool {
        self.entries
            .remove(key)
            .map(|entry| entry.reaper.abort())
            .is_some()
    }
}

/// In-process TTL cache.
///
/// # Thread Safety
///
/// Uses a `Mutex` for interior mutability; the lock is held only for map
/// operations, never across an await point. Safe to share via
/// `Arc<dyn CacheBackend>` across async tasks.
///
/// # Lock Poisoning
///
/// Under a poisoned lock, checks report "not present" and delete/clear
/// become no-ops, keeping the read path fail-open. `set` raises instead: a
/// silently failed insert would let a duplicate through on every later
/// check, and the orchestrator already softens insert errors where that is
/// wanted.
///
/// # Example
///
/// ```rust,ignore
/// use seen::cache::{CacheBackend, CacheConfig, MemoryCache};
/// use std::time::Duration;
///
/// let cache = MemoryCache::new(CacheConfig::default());
/// cache.set("abc", Duration::from_secs(60)).await?;
/// assert!(cache.has("abc").await?);
/// ```
pub struct MemoryCache {
    config: CacheConfig,
    inner: Arc<Mutex<Store>>,
}

impl MemoryCache {
    /// Creates a new in-process cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Store::default())),
        }
    }

    /// Creates a cache with default settings (namespace `dedup`, 5 min TTL).
    #[must_use]
    pub fn default_settings() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Returns the number of stored entries, expired ones included until
    /// their eviction fires.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|store| store.entries.len()).unwrap_or(0)
    }

    /// Returns true if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn full_key(&self, key: &str) -> String {
        namespaced_key(&self.config.namespace, key)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::default_settings()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let full = self.full_key(key);
        let Ok(mut store) = self.inner.lock() else {
            return Ok(false);
        };

        match store.entries.get(&full) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(true),
            Some(_) => {
                // Deadline passed but the scheduled eviction has not fired
                // yet; evict eagerly as part of the read.
                store.evict(&full);
                tracing::debug!(key = %full, "evicted expired entry on read");
                Ok(false)
            },
            None => Ok(false),
        }
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        validate_entry(key, ttl)?;
        let full = self.full_key(key);

        let Ok(mut store) = self.inner.lock() else {
            // A silent no-op here would let a duplicate through on every
            // later check; raise and let the caller decide.
            return Err(CacheError::operation("memory_set", "store lock poisoned"));
        };

        // Cancel the previous eviction before scheduling the replacement.
        store.evict(&full);

        let generation = store.next_generation;
        store.next_generation += 1;
        let expires_at = Instant::now() + ttl;

        let inner = Arc::clone(&self.inner);
        let reaper_key = full.clone();
        let reaper = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Ok(mut store) = inner.lock() {
                // Only remove the entry this task was scheduled for.
                let same_generation = store
                    .entries
                    .get(&reaper_key)
                    .is_some_and(|entry| entry.generation == generation);
                if same_generation {
                    store.entries.remove(&reaper_key);
                    tracing::debug!(key = %reaper_key, "evicted entry at deadline");
                }
            }
        });

        store.entries.insert(
            full,
            Entry {
                expires_at,
                generation,
                reaper,
            },
        );

        metrics::gauge!("seen_memory_cache_size").set(store.entries.len() as f64);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let full = self.full_key(key);
        if let Ok(mut store) = self.inner.lock() {
            store.evict(&full);
            metrics::gauge!("seen_memory_cache_size").set(store.entries.len() as f64);
        }
        Ok(())
    }

    fn supports_clear(&self) -> bool {
        true
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let Ok(mut store) = self.inner.lock() else {
            return Ok(0);
        };

        // Cancel every pending eviction before wiping the store so no timer
        // fires against an already-cleared map.
        for entry in store.entries.values() {
            entry.reaper.abort();
        }
        let removed = store.entries.len() as u64;
        store.entries.clear();

        metrics::gauge!("seen_memory_cache_size").set(0.0);
        tracing::debug!(removed, "cleared in-process cache");
        Ok(removed)
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        // Cancel outstanding evictions so no background work outlives the
        // backend instance that scheduled it.
        if let Ok(store) = self.inner.lock() {
            for entry in store.entries.values() {
                entry.reaper.abort();
            }
        }
    }
}
