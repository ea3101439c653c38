//! Duplicate-suppression orchestrator.
//!
//! Ties canonical hashing to cache lookups: normalize message, derive the
//! cache key, query the backend, insert when absent, report the verdict.
//!
//! # Failure Policy
//!
//! Key derivation is NOT fail-open: a malformed message surfaces as a
//! [`HashError`] instead of being silently treated as non-duplicate. The
//! existence check and the first-seen insert ARE fail-open: backend errors
//! there are caught, logged and answered with "not a duplicate", trading
//! strict suppression for pipeline liveness. Administrative mutations
//! ([`Deduplicator::remove_from_cache`], [`Deduplicator::clear_cache`])
//! propagate backend errors, since the caller explicitly asked for a state
//! change and must know if it failed.
//!
//! # Concurrency
//!
//! The `has`-then-`set` sequence is intentionally not atomic: two concurrent
//! first arrivals of the same key can both observe absence and both report
//! "not duplicate". This is the documented best-effort semantics, not a
//! defect; a distributed backend cannot promise atomic check-and-set across
//! the wire, and adding local locking would only mask that.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::instrument;

use crate::cache::{CacheBackend, CacheConfig, MemoryCache};
use crate::config::DedupConfig;
use crate::error::{DedupError, HashError};
use crate::hasher::PayloadHasher;
use crate::message::{Message, Payload};

/// Result of conditionally processing a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// First-seen message; carries the processor's output.
    Processed(T),
    /// Duplicate within the window; the processor was not invoked.
    Skipped,
}

impl<T> Outcome<T> {
    /// Returns true for a skipped duplicate.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Unwraps the processor output, if any.
    #[must_use]
    pub fn into_processed(self) -> Option<T> {
        match self {
            Self::Processed(output) => Some(output),
            Self::Skipped => None,
        }
    }
}

/// Time-bounded duplicate suppressor.
///
/// Owns exactly one cache backend, injected or default-constructed; backend
/// instances are not shared across deduplicators.
///
/// # Example
///
/// ```rust
/// use seen::{DedupConfig, Deduplicator, Message};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), seen::HashError> {
/// let dedup = Deduplicator::new(DedupConfig::default());
///
/// let first = dedup.is_duplicate(&Message::structured(&json!({"id": "1"}))).await?;
/// let second = dedup.is_duplicate(&Message::structured(&json!({"id": "1"}))).await?;
/// assert!(!first);
/// assert!(second);
/// # Ok(())
/// # }
/// ```
pub struct Deduplicator {
    config: DedupConfig,
    backend: Arc<dyn CacheBackend>,
}

impl Deduplicator {
    /// Creates a deduplicator with an in-process cache backend.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        let backend = MemoryCache::new(
            CacheConfig::default()
                .with_namespace(config.namespace.clone())
                .with_default_ttl(config.ttl),
        );
        Self {
            config,
            backend: Arc::new(backend),
        }
    }

    /// Creates a deduplicator over an injected backend.
    ///
    /// The backend applies its own key namespace; the configured namespace
    /// only affects a default-constructed backend.
    #[must_use]
    pub fn with_backend(config: DedupConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self { config, backend }
    }

    /// Derives the cache key for a message: the explicit key when present,
    /// the canonical payload digest otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] for a missing, unconvertible or un-hashable
    /// payload.
    pub fn derive_key(&self, message: &Message) -> Result<String, HashError> {
        if let Some(key) = &message.explicit_key {
            return Ok(key.clone());
        }
        // A payload that failed JSON conversion is present but broken, not
        // absent; report the captured cause.
        if let Some(e) = &message.conversion_error {
            return Err(HashError::Canonicalize {
                cause: e.to_string(),
            });
        }
        PayloadHasher::hash_optional(message.payload.as_ref(), message.format)
    }

    /// Reports whether an equivalent message was already seen within the
    /// suppression window, recording this one if not.
    ///
    /// A hit never refreshes the existing entry's TTL.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] from key derivation only; backend failures
    /// are fail-open and answered with `false`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Precision loss acceptable for duration metrics
    #[instrument(skip(self, message), fields(operation = "dedup_check", format = %message.format))]
    pub async fn is_duplicate(&self, message: &Message) -> Result<bool, HashError> {
        let start = Instant::now();
        let key = self.derive_key(message)?;

        let duplicate = match self.backend.has(&key).await {
            Ok(true) => true,
            Ok(false) => {
                if let Err(e) = self.backend.set(&key, self.config.ttl).await {
                    tracing::warn!(key = %key, error = %e, "insert failed, continuing fail-open");
                    metrics::counter!("seen_fail_open_total", "operation" => "set").increment(1);
                }
                false
            },
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "existence check failed, continuing fail-open");
                metrics::counter!("seen_fail_open_total", "operation" => "has").increment(1);
                false
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        if self.config.debug {
            tracing::debug!(key = %key, duplicate, duration_ms, "dedup check");
        }
        metrics::histogram!(
            "seen_check_duration_ms",
            "duplicate" => if duplicate { "true" } else { "false" }
        )
        .record(duration_ms as f64);

        Ok(duplicate)
    }

    /// Runs `processor` only for first-seen messages.
    ///
    /// Duplicates short-circuit to [`Outcome::Skipped`] without invoking the
    /// processor. Processor failures are the caller's business: nothing is
    /// caught here.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] from key derivation.
    pub async fn process_if_not_duplicate<'m, T, F, Fut>(
        &self,
        message: &'m Message,
        processor: F,
    ) -> Result<Outcome<T>, HashError>
    where
        F: FnOnce(Option<&'m Payload>) -> Fut,
        Fut: Future<Output = T>,
    {
        if self.is_duplicate(message).await? {
            metrics::counter!("seen_skipped_total").increment(1);
            return Ok(Outcome::Skipped);
        }
        let output = processor(message.payload.as_ref()).await;
        metrics::counter!("seen_processed_total").increment(1);
        Ok(Outcome::Processed(output))
    }

    /// Removes a message's cache entry.
    ///
    /// Administrative: backend errors propagate, they are never fail-open.
    ///
    /// # Errors
    ///
    /// Returns a hashing error from key derivation or the backend's own
    /// failure.
    pub async fn remove_from_cache(&self, message: &Message) -> Result<(), DedupError> {
        let key = self.derive_key(message)?;
        self.backend.delete(&key).await?;
        Ok(())
    }

    /// Clears every entry in the backend's namespace, returning the count
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure, including
    /// [`crate::CacheError::ClearUnsupported`] for backends without the
    /// capability.
    pub async fn clear_cache(&self) -> Result<u64, DedupError> {
        let removed = self.backend.clear().await?;
        Ok(removed)
    }
}
