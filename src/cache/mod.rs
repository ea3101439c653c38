//! TTL-backed existence caches.
//!
//! The cache layer answers one question: has this key been seen within its
//! time window? Two backends implement one contract:
//!
//! | Backend | Use Case | Expiry Mechanism |
//! |---------|----------|------------------|
//! | [`MemoryCache`] | Default; single process | Per-entry tokio eviction task |
//! | [`RedisCache`] | Shared across processes | Server-side `SET ... EX` |
//!
//! # Implementor Notes
//!
//! - Methods use `&self` to enable sharing via `Arc<dyn CacheBackend>`
//! - Use interior mutability for mutable state
//! - `has` must never error for a missing key, and must treat an entry whose
//!   expiry has passed as absent even when physical deletion is deferred
//! - `delete` on an absent key is a no-op, never an error
//! - Backends that cannot bulk-clear report the capability absent via
//!   [`CacheBackend::supports_clear`] instead of raising at call time

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;

use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Default TTL for cache entries: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "dedup";

/// Shared settings composed by every backend.
///
/// This is deliberately a plain struct plus free helpers rather than
/// inherited state: each backend composes the namespacing and TTL defaults
/// instead of extending a common base.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix prepended to every key, isolating concurrent users of a shared
    /// store.
    pub namespace: String,
    /// TTL applied when the caller does not specify one.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Builder method to set the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Builder method to set the default TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Prepends the namespace to a key.
///
/// # Example
///
/// ```rust
/// use seen::cache::namespaced_key;
///
/// assert_eq!(namespaced_key("dedup", "abc"), "dedup:abc");
/// ```
#[must_use]
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Validates a key and TTL before any backend mutation.
///
/// # Errors
///
/// Returns [`CacheError::EmptyKey`] for an empty key and
/// [`CacheError::InvalidTtl`] for a TTL under one whole second.
pub fn validate_entry(key: &str, ttl: Duration) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::EmptyKey);
    }
    if ttl.as_secs() == 0 {
        return Err(CacheError::InvalidTtl);
    }
    Ok(())
}

/// Trait for TTL-backed existence cache backends.
///
/// Callers depend only on this capability set, never on a concrete backend
/// type, so the in-process and networked caches are interchangeable.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns true iff an unexpired entry for `key` exists.
    ///
    /// Never errors for a missing key. An entry whose expiry has passed is
    /// reported absent even if its physical deletion is still pending.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures the implementation does
    /// not soften itself; the networked backend soft-returns `false` on
    /// connectivity loss instead.
    async fn has(&self, key: &str) -> Result<bool, CacheError>;

    /// Creates or replaces the entry for `key`, resetting its expiry to
    /// `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTtl`] for a zero TTL and
    /// [`CacheError::EmptyKey`] for an empty key, in both cases before any
    /// backend mutation.
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Removes the entry if present. Deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails in a way the backend does not
    /// swallow as best-effort.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Whether this backend supports bulk clearing.
    fn supports_clear(&self) -> bool {
        false
    }

    /// Removes all entries in this backend's namespace, returning the count
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ClearUnsupported`] when
    /// [`CacheBackend::supports_clear`] is false.
    async fn clear(&self) -> Result<u64, CacheError> {
        Err(CacheError::ClearUnsupported)
    }
}
