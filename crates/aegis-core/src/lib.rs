//! Aegis core primitives and shared types.
//!
//! This crate has no notion of classification or policy — it provides the
//! small set of building blocks the rest of the Aegis workspace needs to
//! stay deterministic: monotonic/trace ids, RFC 3339 timestamps, and the
//! canonical-JSON + hashing/HMAC helpers used for stable fingerprints and
//! signatures (see [`canonical`]).

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Version of the Aegis core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod canonical;
pub mod ids;

pub use canonical::{compute_hash, stable_fingerprint, CanonError};
