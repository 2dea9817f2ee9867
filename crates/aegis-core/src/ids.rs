//! ID and timestamp utilities: monotonic ids, trace ids, RFC 3339 clocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new monotonic identifier (starts at 1). Useful for building
/// stable, order-preserving ids without a central counter service.
pub fn next_monotonic_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Milliseconds since UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

/// Current time formatted as RFC 3339 UTC with a `Z` suffix, per the
/// canonicalization rule used for every timestamp this workspace emits.
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A fresh, lowercase-hyphenated UUID v4, the canonical identifier format
/// used for decision ids, obligation ids, and trace ids.
pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}
