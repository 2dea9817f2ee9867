//! Canonical JSON serialization, content hashing and HMAC signing.
//!
//! Every hash or signature produced by the Aegis workspace goes through a
//! single canonicalization rule: keys sorted at every nesting level,
//! ASCII-safe escapes, no whitespace between tokens, UTF-8 before hashing.
//! This makes `compute_hash`/`stable_fingerprint`/HMAC signatures stable
//! across serialization libraries, field insertion order, and languages.

use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while canonicalizing or hashing an entity.
#[derive(Debug, Error)]
pub enum CanonError {
    /// The entity could not be serialized to JSON.
    #[error("failed to serialize entity to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render a [`Value`] as canonical JSON: object keys sorted lexicographically
/// at every level, no insignificant whitespace, non-ASCII characters escaped
/// as `\uXXXX`.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped_string(key, out);
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn write_escaped_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}

/// SHA-256 hex digest of `bytes` (lowercase, no prefix).
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `bytes` under `key`.
///
/// # Panics
/// Never panics: HMAC accepts keys of any length.
#[must_use]
pub fn hmac_sha256_hex(key: &[u8], bytes: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(bytes);
    hex::encode(mac.finalize().into_bytes())
}

/// Hash the full canonical JSON dump of `entity`, timestamps included.
///
/// Distinct from [`stable_fingerprint`], which excludes timestamp fields —
/// the two must never be conflated.
pub fn compute_hash<T: Serialize>(entity: &T) -> Result<String, CanonError> {
    let value = serde_json::to_value(entity)?;
    Ok(format!("sha256:{}", sha256_hex(canonical_json(&value).as_bytes())))
}

/// Hash `entity` excluding `exclude_fields` plus the always-excluded
/// `created_at`/`updated_at` timestamp fields, so the fingerprint is
/// invariant under changes to those fields.
pub fn stable_fingerprint<T: Serialize>(
    entity: &T,
    exclude_fields: &[&str],
) -> Result<String, CanonError> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(map) = &mut value {
        map.remove("created_at");
        map.remove("updated_at");
        for field in exclude_fields {
            map.remove(*field);
        }
    }
    Ok(format!("sha256:{}", sha256_hex(canonical_json(&value).as_bytes())))
}
