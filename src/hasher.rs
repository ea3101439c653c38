//! Canonical payload hashing for dedup keys.
//!
//! This module provides SHA256-based identity hashing for messages. A
//! structured payload is canonicalized before hashing so that two payloads
//! that differ only in field ordering produce the same digest; a binary
//! payload is digested from its stable byte encoding without any
//! canonicalization step.

use sha2::{Digest, Sha256};

use crate::error::HashError;
use crate::message::{Payload, PayloadFormat};

/// Payload hasher for dedup key derivation.
///
/// # Canonicalization
///
/// Before hashing, a structured payload is rendered to a canonical text
/// encoding:
/// - object keys sorted lexicographically at every nesting level
/// - array element order preserved (order matters for sequences)
/// - explicit `null` kept as the literal `null`; absent fields simply never
///   appear (serde drops skipped `Option` fields before the value is built)
/// - strings escaped deterministically, numbers in their JSON rendering
///
/// Date/time values are expected to arrive as fixed ISO-8601 strings, which
/// is what chrono's serde support produces.
///
/// # Example
///
/// ```rust
/// use seen::PayloadHasher;
/// use seen::{Payload, PayloadFormat};
/// use serde_json::json;
///
/// let a = Payload::Structured(json!({"b": 2, "a": 1}));
/// let b = Payload::Structured(json!({"a": 1, "b": 2}));
///
/// let ha = PayloadHasher::hash(&a, PayloadFormat::Structured).unwrap();
/// let hb = PayloadHasher::hash(&b, PayloadFormat::Structured).unwrap();
/// assert_eq!(ha, hb); // field order never changes the digest
/// assert_eq!(ha.len(), 64);
/// ```
pub struct PayloadHasher;

impl PayloadHasher {
    /// Computes the hex-encoded SHA256 digest of a payload.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::MissingEncoder`] when binary hashing is requested
    /// for a payload without a byte-serialization capability, and
    /// [`HashError::Encode`] when the capability itself fails (the underlying
    /// cause is preserved as the error source).
    pub fn hash(payload: &Payload, format: PayloadFormat) -> Result<String, HashError> {
        match (format, payload) {
            (PayloadFormat::Structured, Payload::Structured(value)) => {
                Ok(Self::digest(Self::canonicalize(value).as_bytes()))
            },
            // An opaque byte buffer is passed through unmodified rather than
            // recursed into; the encoder already owns its stable form.
            (PayloadFormat::Structured | PayloadFormat::Binary, Payload::Binary(encoder)) => {
                let bytes = encoder
                    .encode()
                    .map_err(|source| HashError::Encode { source })?;
                Ok(Self::digest(&bytes))
            },
            (PayloadFormat::Binary, Payload::Structured(_)) => Err(HashError::MissingEncoder),
        }
    }

    /// Computes the digest of an optional payload, rejecting absence.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::MissingPayload`] for `None`; a missing payload
    /// is never silently hashed to a sentinel value.
    pub fn hash_optional(
        payload: Option<&Payload>,
        format: PayloadFormat,
    ) -> Result<String, HashError> {
        payload.map_or(Err(HashError::MissingPayload), |p| Self::hash(p, format))
    }

    /// Renders a JSON value to its canonical text encoding.
    ///
    /// Pure and deterministic: repeated calls on an unchanged value yield the
    /// identical string. A bare `null` or primitive renders as its literal
    /// JSON text with no normalization step.
    #[must_use]
    pub fn canonicalize(value: &serde_json::Value) -> String {
        let mut out = String::new();
        write_canonical(value, &mut out);
        out
    }

    fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

/// Recursively writes the canonical encoding of a value.
fn write_canonical(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        Value::Object(map) => {
            // Sort keys at every level so field order never leaks into the
            // digest. Explicit nulls stay; absent fields were never inserted.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        },
    }
}

/// Writes a deterministically escaped JSON string literal.
fn write_escaped(s: &str, out: &mut String) {
    use std::fmt::Write as _;

    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                // Infallible for String targets.
                let _ = write!(out, "\\u{:04x}", c as u32);
            },
            c => out.push(c),
        }
    }
    out.push('"');
}
