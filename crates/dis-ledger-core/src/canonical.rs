//! Canonical JSON encoding and SHA-256 digests.
//!
//! Canonical form rules:
//! - Object keys sorted lexicographically (byte order), recursively
//! - Array order preserved
//! - Scalars emitted unchanged, no insignificant whitespace
//!
//! Logically identical values therefore produce identical bytes (and thus
//! identical hashes) no matter how the source ordered its keys.
//!
//! Receipt hashes do not go through canonical JSON. They are computed over
//! the pipe-joined payload built by [`receipt_payload`], which is the format
//! every previously issued receipt was hashed with.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Separator between receipt payload fields.
pub const PAYLOAD_SEPARATOR: char = '|';

/// Encode a JSON value to canonical bytes.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(&sorted(value)).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Serialize any value, then encode it canonically.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    canonicalize(&value)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k.clone(), sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        scalar => scalar.clone(),
    }
}

/// Lowercase hex SHA-256 digest.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `digest(canonicalize(value))`.
pub fn hash_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(digest(&canonical_bytes(value)?))
}

/// Build the deterministic receipt payload from its six hashed fields.
pub fn receipt_payload(
    actor: &str,
    action: &str,
    created_at: &str,
    frozen_core_hash: &str,
    console_id: &str,
    issuer_seat: &str,
) -> String {
    [actor, action, created_at, frozen_core_hash, console_id, issuer_seat]
        .join(&PAYLOAD_SEPARATOR.to_string())
}

/// Fingerprint a whole registry snapshot.
///
/// Item hashes are sorted, concatenated, then digested, so the result
/// depends only on the set of items and not on enumeration order.
pub fn freeze_fingerprint<I, S>(item_hashes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hashes: Vec<String> = item_hashes
        .into_iter()
        .map(|h| h.as_ref().to_owned())
        .collect();
    hashes.sort();
    digest(hashes.concat().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonicalize_sorts_nested_keys() {
        let value = json!({
            "zeta": 1,
            "alpha": {"y": true, "b": null},
            "mid": [{"k2": "v", "k1": "v"}, 3]
        });
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"alpha":{"b":null,"y":true},"mid":[{"k1":"v","k2":"v"},3],"zeta":1}"#
        );
    }

    #[test]
    fn test_canonicalize_preserves_array_order() {
        let a = canonicalize(&json!([3, 1, 2])).unwrap();
        let b = canonicalize(&json!([1, 2, 3])).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, b"[3,1,2]");
    }

    #[test]
    fn test_canonicalize_scalars_unchanged() {
        assert_eq!(canonicalize(&json!("a|b")).unwrap(), br#""a|b""#);
        assert_eq!(canonicalize(&json!(1.5)).unwrap(), b"1.5");
        assert_eq!(canonicalize(&json!(null)).unwrap(), b"null");
    }

    #[test]
    fn test_digest_known_value() {
        assert_eq!(
            digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_receipt_payload_joins_in_order() {
        let payload = receipt_payload("a", "b", "c", "d", "e", "f");
        assert_eq!(payload, "a|b|c|d|e|f");
    }

    #[test]
    fn test_freeze_fingerprint_order_independent() {
        let a = freeze_fingerprint(["bb", "aa", "cc"]);
        let b = freeze_fingerprint(vec!["cc".to_string(), "aa".into(), "bb".into()]);
        assert_eq!(a, b);
        assert_eq!(a, digest(b"aabbcc"));
    }

    #[test]
    fn test_freeze_fingerprint_empty_registry() {
        assert_eq!(freeze_fingerprint(Vec::<String>::new()), digest(b""));
    }

    #[test]
    fn test_hash_value_ignores_key_order() {
        let a = hash_value(&json!({"total": 2, "valid": 1})).unwrap();
        let b = hash_value(&json!({"valid": 1, "total": 2})).unwrap();
        assert_eq!(a, b);
    }
}
