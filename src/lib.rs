//! # Seen
//!
//! Time-bounded duplicate suppression for message pipelines.
//!
//! Given a message, `seen` decides within a configurable window whether an
//! equivalent message has already been processed, so the caller can skip
//! reprocessing. Identity comes from format-aware canonical hashing (field
//! order never matters for structured payloads) or a caller-supplied key;
//! presence is tracked by a pluggable TTL cache with an in-process backend
//! and a Redis backend behind one contract.
//!
//! ## Semantics
//!
//! - Best-effort, not exactly-once: concurrent first arrivals of the same
//!   key may both be reported as new.
//! - Fail-open on infrastructure trouble: a broken cache answers "not a
//!   duplicate" rather than blocking the pipeline. Malformed messages are
//!   the exception: hashing errors always surface.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seen::{DedupConfig, Deduplicator, Message, Outcome};
//! use serde_json::json;
//!
//! let dedup = Deduplicator::new(DedupConfig::default());
//!
//! let msg = Message::structured(&json!({"order_id": "o-1", "qty": 2}));
//! match dedup.process_if_not_duplicate(&msg, |payload| handle(payload)).await? {
//!     Outcome::Processed(receipt) => println!("handled: {receipt:?}"),
//!     Outcome::Skipped => println!("duplicate, skipped"),
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Module declarations
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod hasher;
pub mod message;

// Re-exports for convenience
#[cfg(feature = "redis")]
pub use cache::RedisCache;
pub use cache::{CacheBackend, CacheConfig, MemoryCache};
pub use config::DedupConfig;
pub use dedup::{Deduplicator, Outcome};
pub use error::{CacheError, DedupError, HashError, Result};
pub use hasher::PayloadHasher;
pub use message::{ByteEncode, Message, Payload, PayloadFormat};
