//! Validation-time error taxonomy (§7 kind 2).
//!
//! Access denial is never an error — it is a [`crate::pdp::Decision`] with
//! `allowed: false`. These errors are only raised when a policy document,
//! dotted path, or classification/compartment code is malformed, at
//! construction time, before the PDP ever sees the policy.

use thiserror::Error;

/// Validation failures surfaced while loading or constructing a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A classification code did not match any known [`crate::lattice::ClassificationLevel`].
    #[error("unknown classification code: {0}")]
    UnknownClassificationCode(String),

    /// A compartment code did not match any known [`crate::lattice::Compartment`].
    #[error("unknown compartment code: {0}")]
    UnknownCompartmentCode(String),

    /// A dotted field path was empty.
    #[error("dotted path must have at least one segment")]
    EmptyDottedPath,

    /// A dotted field path segment was malformed (e.g. `foo[` with no closing bracket).
    #[error("invalid dotted path segment: {0}")]
    InvalidPathSegment(String),

    /// A `FieldRedactionRule` declared neither `required_clearance` nor
    /// `required_compartments`, making it a no-op by construction.
    #[error("field rule '{0}' must set required_clearance and/or required_compartments")]
    VacuousFieldRule(String),

    /// The policy document failed to parse as YAML.
    #[error("malformed policy YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The policy document failed to parse as JSON.
    #[error("malformed policy JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The policy file could not be read from disk.
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
}
