// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical serialization and content hashing.
//!
//! Every content hash in mcpforge (revisions, the tool registry hash,
//! persisted-record revisions) is computed the same way: serialize to
//! `serde_json::Value`, recursively sort object keys, emit compact bytes
//! with no incidental whitespace, then SHA-256 the result. This makes the
//! hash stable under field reordering and serializer whitespace choices,
//! which is the guarantee spec §3 requires of `Revision`.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serialize `value` to canonical bytes: object keys sorted, no whitespace.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized to JSON at all (e.g. it
/// contains a non-finite float, which `serde_json` rejects).
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let raw = serde_json::to_value(value)?;
    let sorted = sort_keys(raw);
    serde_json::to_vec(&sorted)
}

/// Hex-encoded SHA-256 of `value`'s canonical bytes.
///
/// # Errors
///
/// Propagates [`canonical_bytes`]'s serialization error.
pub fn sha256_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = canonical_bytes(value)?;
    Ok(hex_digest(&bytes))
}

/// Hex-encoded SHA-256 of raw bytes, with no canonicalization step.
#[must_use]
pub fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_order_does_not_affect_hash() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(sha256_hex(&a).unwrap(), sha256_hex(&b).unwrap());
    }

    #[test]
    fn nested_object_key_order_is_normalized() {
        let a = json!({"outer": {"z": 1, "y": 2}});
        let b = json!({"outer": {"y": 2, "z": 1}});
        assert_eq!(sha256_hex(&a).unwrap(), sha256_hex(&b).unwrap());
    }

    #[test]
    fn different_content_yields_different_hash() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(sha256_hex(&a).unwrap(), sha256_hex(&b).unwrap());
    }
}
