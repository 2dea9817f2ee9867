//! Classification lattice: a totally ordered set of classification levels
//! with a dominance relation, and closed compartment tags with subset-based
//! containment.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// A closed, totally ordered classification level. Higher rank dominates
/// lower rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClassificationLevel {
    /// Unclassified — rank 0.
    Unclassified,
    /// Controlled Unclassified Information — rank 1.
    Cui,
    /// Confidential — rank 2.
    Confidential,
    /// Secret — rank 3.
    Secret,
    /// Top Secret — rank 4.
    TopSecret,
    /// Top Secret / Sensitive Compartmented Information — rank 5.
    TsSci,
}

impl ClassificationLevel {
    /// All levels, lowest rank first.
    pub const ALL: [ClassificationLevel; 6] = [
        ClassificationLevel::Unclassified,
        ClassificationLevel::Cui,
        ClassificationLevel::Confidential,
        ClassificationLevel::Secret,
        ClassificationLevel::TopSecret,
        ClassificationLevel::TsSci,
    ];

    /// Numeric dominance rank; higher dominates lower.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            ClassificationLevel::Unclassified => 0,
            ClassificationLevel::Cui => 1,
            ClassificationLevel::Confidential => 2,
            ClassificationLevel::Secret => 3,
            ClassificationLevel::TopSecret => 4,
            ClassificationLevel::TsSci => 5,
        }
    }

    /// External short code, e.g. `"S"` for Secret.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            ClassificationLevel::Unclassified => "U",
            ClassificationLevel::Cui => "CUI",
            ClassificationLevel::Confidential => "C",
            ClassificationLevel::Secret => "S",
            ClassificationLevel::TopSecret => "TS",
            ClassificationLevel::TsSci => "TS//SCI",
        }
    }

    /// Parse an external short code. Unknown codes are rejected rather than
    /// silently coerced, so untrusted input never reaches the PDP as an
    /// impossible classification.
    pub fn from_code(code: &str) -> Result<Self, PolicyError> {
        Self::ALL
            .into_iter()
            .find(|lvl| lvl.code() == code)
            .ok_or_else(|| PolicyError::UnknownClassificationCode(code.to_string()))
    }

    /// Whether `self` dominates `other` (`self.rank() >= other.rank()`).
    #[must_use]
    pub const fn dominates(self, other: ClassificationLevel) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for ClassificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<String> for ClassificationLevel {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

impl From<ClassificationLevel> for String {
    fn from(value: ClassificationLevel) -> Self {
        value.code().to_string()
    }
}

/// A closed enumeration of compartment tags. Subject/resource compartment
/// checks are subset-based (§ Compartment containment).
///
/// Variant order is lexicographic by code, which is what every
/// sorted-by-code output (denial messages, banners) relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Compartment {
    /// Human Intelligence.
    Humint,
    /// Not Releasable to Foreign Nationals.
    Noforn,
    /// Signals Intelligence.
    Sigint,
    /// Talent Keyhole.
    Tk,
}

impl Compartment {
    /// All compartments, in the same lexicographic order as [`Compartment::code`].
    pub const ALL: [Compartment; 4] =
        [Compartment::Humint, Compartment::Noforn, Compartment::Sigint, Compartment::Tk];

    /// External short code, e.g. `"NOFORN"`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Compartment::Humint => "HUMINT",
            Compartment::Noforn => "NOFORN",
            Compartment::Sigint => "SIGINT",
            Compartment::Tk => "TK",
        }
    }

    /// Parse an external short code. Unknown codes are rejected at the
    /// deserialization boundary.
    pub fn from_code(code: &str) -> Result<Self, PolicyError> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| PolicyError::UnknownCompartmentCode(code.to_string()))
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<String> for Compartment {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_code(&value)
    }
}

impl From<Compartment> for String {
    fn from(value: Compartment) -> Self {
        value.code().to_string()
    }
}

/// A set of compartments, always iterated/sorted lexicographically by code.
pub type CompartmentSet = BTreeSet<Compartment>;

/// Compartments present in `required` but absent from `held`, sorted
/// lexicographically by code — the exact ordering §4.1's compartment check
/// needs for a deterministic denial message.
#[must_use]
pub fn missing_compartments(required: &CompartmentSet, held: &CompartmentSet) -> Vec<Compartment> {
    required.difference(held).copied().collect()
}

/// Render a compartment set as comma-separated codes, sorted lexicographically.
#[must_use]
pub fn join_codes(compartments: &CompartmentSet) -> String {
    compartments.iter().map(Compartment::code).collect::<Vec<_>>().join(", ")
}
