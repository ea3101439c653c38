//! Message envelope for duplicate suppression.
//!
//! A [`Message`] is one unit of work to be checked against the cache. It is
//! created per invocation by the caller and never persisted beyond the cache
//! key derived from it.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// How a payload should be turned into bytes for hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Structured value; canonicalized before hashing so that field order
    /// never affects the digest.
    Structured,
    /// Pre-serialized binary payload; raw bytes are digested directly since
    /// the encoder is assumed to already produce a stable encoding.
    Binary,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Deterministic byte-serialization capability for binary payloads.
///
/// The core does not pick a serialization library; any payload that can
/// render itself to a stable byte sequence qualifies. Implementations must be
/// deterministic: the same logical value must always encode to the same
/// bytes, or equal messages will stop hashing to equal keys.
pub trait ByteEncode: Send + Sync {
    /// Encodes the payload to its stable byte representation.
    ///
    /// # Errors
    ///
    /// Returns the encoder's own error; the hasher wraps it with the cause
    /// preserved.
    fn encode(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Plain byte slices are trivially their own stable encoding.
impl ByteEncode for Vec<u8> {
    fn encode(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.clone())
    }
}

/// The payload carried by a message.
pub enum Payload {
    /// A structured JSON-like value.
    Structured(Value),
    /// An opaque payload with a byte-serialization capability.
    Binary(Box<dyn ByteEncode>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
            Self::Binary(_) => f.debug_tuple("Binary").field(&"<bytes>").finish(),
        }
    }
}

/// One unit of work to deduplicate.
///
/// # Example
///
/// ```rust
/// use seen::{Message, PayloadFormat};
/// use serde_json::json;
///
/// let msg = Message::structured(&json!({"id": "order-1"}));
/// assert_eq!(msg.format, PayloadFormat::Structured);
///
/// // Callers that already know a stable identity skip hashing entirely.
/// let keyed = Message::structured(&json!({"id": "order-1"})).with_key("order-1");
/// assert_eq!(keyed.explicit_key.as_deref(), Some("order-1"));
/// ```
#[derive(Debug)]
pub struct Message {
    /// The payload to derive identity from. `None` fails key derivation.
    pub payload: Option<Payload>,
    /// How the payload should be hashed.
    pub format: PayloadFormat,
    /// Caller-supplied identity that bypasses hashing when present.
    pub explicit_key: Option<String>,
    /// Serialization failure captured at construction; surfaces as a
    /// canonicalization error at check time instead of being silently
    /// treated as an absent payload.
    pub conversion_error: Option<serde_json::Error>,
}

impl Message {
    /// Wraps a serializable value as a structured message.
    ///
    /// Date/time fields serialized through chrono arrive as fixed ISO-8601
    /// strings, and `Option` fields skipped at serialization time are absent
    /// from the canonical form, so two logically equal values hash equally.
    ///
    /// A value that fails JSON conversion produces a message carrying the
    /// failure; checking it surfaces a canonicalization error with the
    /// cause, never a missing-payload error.
    #[must_use]
    pub fn structured<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self {
                payload: Some(Payload::Structured(value)),
                format: PayloadFormat::Structured,
                explicit_key: None,
                conversion_error: None,
            },
            Err(e) => Self {
                payload: None,
                format: PayloadFormat::Structured,
                explicit_key: None,
                conversion_error: Some(e),
            },
        }
    }

    /// Wraps a byte-encodable payload as a binary message.
    #[must_use]
    pub fn binary(payload: impl ByteEncode + 'static) -> Self {
        Self {
            payload: Some(Payload::Binary(Box::new(payload))),
            format: PayloadFormat::Binary,
            explicit_key: None,
            conversion_error: None,
        }
    }

    /// Builds a message with no payload at all.
    ///
    /// Useful with [`Message::with_key`]; without an explicit key, checking
    /// such a message fails with a hashing error.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            payload: None,
            format: PayloadFormat::Structured,
            explicit_key: None,
            conversion_error: None,
        }
    }

    /// Builder method to attach an explicit dedup key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.explicit_key = Some(key.into());
        self
    }
}

/// A bare JSON value normalizes to a structured message.
impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self {
            payload: Some(Payload::Structured(value)),
            format: PayloadFormat::Structured,
            explicit_key: None,
            conversion_error: None,
        }
    }
}
