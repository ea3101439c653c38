//! Error types for duplicate suppression.
//!
//! Uses `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The taxonomy deliberately separates hashing failures from cache failures
//! because the two propagate differently: a [`HashError`] always surfaces to
//! the caller (a malformed message must never be silently treated as
//! non-duplicate), while a [`CacheError`] is fail-open-suppressed inside the
//! duplicate check but propagates from administrative operations.

use thiserror::Error;

/// Error deriving a dedup key from a message payload.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `MissingPayload` | Message carries no payload at all |
/// | `MissingEncoder` | Binary format requested but payload has no byte-serialization capability |
/// | `Canonicalize` | The payload could not be converted to a canonical structured value |
/// | `Encode` | The payload's byte encoder itself failed |
#[derive(Debug, Error)]
pub enum HashError {
    /// The message has no payload to hash.
    ///
    /// An absent payload is never hashed to a sentinel value.
    #[error("cannot hash a missing payload")]
    MissingPayload,

    /// The payload could not be converted to a canonical structured value.
    ///
    /// Raised for a payload whose JSON conversion failed at construction;
    /// distinct from [`HashError::MissingPayload`] so a present-but-broken
    /// payload never masquerades as an absent one.
    #[error("payload canonicalization failed: {cause}")]
    Canonicalize {
        /// Rendering of the underlying serialization error.
        cause: String,
    },

    /// Binary hashing was requested for a payload that cannot serialize
    /// itself to bytes.
    #[error("payload does not expose a byte-serialization capability")]
    MissingEncoder,

    /// The payload's byte encoder failed.
    ///
    /// The underlying cause is preserved as the error source.
    #[error("payload serialization failed: {source}")]
    Encode {
        /// The underlying encoder error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Error from a cache backend operation.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidTtl` | TTL of zero seconds passed to `set` |
/// | `EmptyKey` | Empty key passed to any mutation |
/// | `ConnectionDown` | Networked backend known-disconnected on a non-fail-open operation |
/// | `ClearUnsupported` | `clear` called on a backend without the capability |
/// | `Operation` | The underlying store rejected or failed the command |
#[derive(Debug, Error)]
pub enum CacheError {
    /// TTL must be at least one whole second.
    #[error("invalid ttl: must be at least 1 second")]
    InvalidTtl,

    /// Cache keys must be non-empty.
    #[error("cache key must not be empty")]
    EmptyKey,

    /// The backend's connection is down and the operation is not fail-open.
    #[error("cache connection is down")]
    ConnectionDown,

    /// The backend does not support bulk clearing.
    #[error("backend does not support clear")]
    ClearUnsupported,

    /// A backend command failed.
    #[error("cache operation '{operation}' failed: {cause}")]
    Operation {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl CacheError {
    /// Builds an [`CacheError::Operation`] from an operation name and cause.
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::Operation {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Combined error for orchestrator-level operations that can fail either way.
#[derive(Debug, Error)]
pub enum DedupError {
    /// Key derivation failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A cache backend operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type alias for duplicate-suppression operations.
pub type Result<T, E = DedupError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_error_display() {
        assert_eq!(
            HashError::MissingPayload.to_string(),
            "cannot hash a missing payload"
        );
        assert_eq!(
            HashError::MissingEncoder.to_string(),
            "payload does not expose a byte-serialization capability"
        );
        assert_eq!(
            HashError::Canonicalize {
                cause: "key must be a string".to_string(),
            }
            .to_string(),
            "payload canonicalization failed: key must be a string"
        );
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::operation("redis_set", "broken pipe");
        assert_eq!(
            err.to_string(),
            "cache operation 'redis_set' failed: broken pipe"
        );
        assert_eq!(
            CacheError::InvalidTtl.to_string(),
            "invalid ttl: must be at least 1 second"
        );
    }

    #[test]
    fn test_dedup_error_is_transparent() {
        let err = DedupError::from(CacheError::EmptyKey);
        assert_eq!(err.to_string(), CacheError::EmptyKey.to_string());

        let err = DedupError::from(HashError::MissingPayload);
        assert_eq!(err.to_string(), HashError::MissingPayload.to_string());
    }

    #[test]
    fn test_encode_error_preserves_source() {
        use std::error::Error as _;

        let inner = std::io::Error::other("encoder exploded");
        let err = HashError::Encode {
            source: Box::new(inner),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("encoder exploded"));
    }
}
