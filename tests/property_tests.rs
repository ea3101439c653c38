//! Property-based tests for canonical hashing.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Hashing is pure: same payload, same digest, every time
//! - Digests are always 64 lowercase hex characters
//! - Object key insertion order never affects the digest
//! - Distinct scalar payloads produce distinct digests
//! - Canonicalization is deterministic and stable under re-parsing

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use seen::{Payload, PayloadFormat, PayloadHasher};
use serde_json::{Map, Value, json};

/// Strategy producing arbitrary JSON values, three levels deep.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _.-]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(|pairs| {
                let mut map = Map::new();
                for (k, v) in pairs {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    /// Property: hashing is a pure function of the payload.
    #[test]
    fn prop_hash_is_pure(value in arb_json()) {
        let payload = Payload::Structured(value);
        let h1 = PayloadHasher::hash(&payload, PayloadFormat::Structured).unwrap();
        let h2 = PayloadHasher::hash(&payload, PayloadFormat::Structured).unwrap();
        prop_assert_eq!(h1, h2);
    }

    /// Property: every digest is 64 lowercase hex characters.
    #[test]
    fn prop_digest_shape(value in arb_json()) {
        let payload = Payload::Structured(value);
        let hash = PayloadHasher::hash(&payload, PayloadFormat::Structured).unwrap();
        prop_assert_eq!(hash.len(), 64);
        prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Property: inserting the same fields in any order yields one digest.
    #[test]
    fn prop_key_order_is_irrelevant(
        entries in prop::collection::hash_map("[a-z]{1,8}", any::<i64>(), 1..8),
        seed in any::<u64>(),
    ) {
        let pairs: Vec<(String, i64)> = entries.into_iter().collect();
        let mut forward = Map::new();
        for (k, v) in &pairs {
            forward.insert(k.clone(), json!(v));
        }

        // Rotate the insertion order by the seed.
        let rotation = (seed as usize) % pairs.len();
        let mut rotated = Map::new();
        for (k, v) in pairs.iter().cycle().skip(rotation).take(pairs.len()) {
            rotated.insert(k.clone(), json!(v));
        }

        let ha = PayloadHasher::hash(
            &Payload::Structured(Value::Object(forward)),
            PayloadFormat::Structured,
        ).unwrap();
        let hb = PayloadHasher::hash(
            &Payload::Structured(Value::Object(rotated)),
            PayloadFormat::Structured,
        ).unwrap();
        prop_assert_eq!(ha, hb);
    }

    /// Property: distinct integers hash to distinct digests.
    #[test]
    fn prop_distinct_scalars_distinct_digests(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let ha = PayloadHasher::hash(
            &Payload::Structured(json!({"v": a})),
            PayloadFormat::Structured,
        ).unwrap();
        let hb = PayloadHasher::hash(
            &Payload::Structured(json!({"v": b})),
            PayloadFormat::Structured,
        ).unwrap();
        prop_assert_ne!(ha, hb);
    }

    /// Property: the canonical form survives a parse round trip.
    ///
    /// Canonical output is itself valid JSON; re-parsing and re-canonicalizing
    /// reproduces the identical string, so the encoding is a fixed point.
    #[test]
    fn prop_canonical_form_is_fixed_point(value in arb_json()) {
        let canonical = PayloadHasher::canonicalize(&value);
        let reparsed: Value = serde_json::from_str(&canonical).expect("canonical form parses");
        prop_assert_eq!(PayloadHasher::canonicalize(&reparsed), canonical);
    }

    /// Property: binary digests equal the digest of the encoded bytes,
    /// independent of the declared format.
    #[test]
    fn prop_binary_payload_ignores_canonicalization(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let as_binary = PayloadHasher::hash(
            &Payload::Binary(Box::new(bytes.clone())),
            PayloadFormat::Binary,
        ).unwrap();
        let as_structured = PayloadHasher::hash(
            &Payload::Binary(Box::new(bytes)),
            PayloadFormat::Structured,
        ).unwrap();
        prop_assert_eq!(as_binary, as_structured);
    }
}
