//! Configuration for duplicate suppression.

use std::time::Duration;

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_TTL};

/// Configuration for a [`crate::Deduplicator`].
///
/// Immutable after construction: the deduplicator and its backend are built
/// from a snapshot of these values.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `SEEN_TTL_SECS` | u64 | `300` | Suppression window in whole seconds |
/// | `SEEN_NAMESPACE` | string | `dedup` | Cache key namespace |
/// | `SEEN_DEBUG` | bool | `false` | Emit per-check debug events |
///
/// # Example
///
/// ```rust
/// use seen::DedupConfig;
/// use std::time::Duration;
///
/// let config = DedupConfig::default();
/// assert_eq!(config.ttl, Duration::from_secs(300));
/// assert_eq!(config.namespace, "dedup");
/// assert!(!config.debug);
/// ```
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// How long a seen message suppresses its duplicates. Interpreted in
    /// whole seconds; a zero TTL is rejected before any backend mutation.
    pub ttl: Duration,

    /// Namespace prepended to every cache key.
    pub namespace: String,

    /// Emit a debug event for every check. A side channel only, never a
    /// substitute for error propagation.
    pub debug: bool,
}

impl DedupConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Falls back to defaults for any unset variable.
    #[must_use]
    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("SEEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TTL.as_secs());

        let namespace =
            std::env::var("SEEN_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let debug = std::env::var("SEEN_DEBUG")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Self {
            ttl: Duration::from_secs(ttl_secs),
            namespace,
            debug,
        }
    }

    /// Builder method to set the suppression TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builder method to set the key namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Builder method to toggle per-check debug events.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            namespace: DEFAULT_NAMESPACE.to_string(),
            debug: false,
        }
    }
}
