//! Classification Aggregator: deterministic reduction of classified entities
//! into a single banner, optionally HMAC-signed for cache stability.

use serde::{Deserialize, Serialize};
use serde_json::json;

use aegis_core::canonical::{canonical_json, hmac_sha256_hex};
use aegis_core::ids::rfc3339_now;

use crate::lattice::{ClassificationLevel, CompartmentSet};

/// A single entity contributing to a banner aggregation.
#[derive(Debug, Clone)]
pub struct ClassifiedEntity {
    /// The entity's classification level.
    pub classification: ClassificationLevel,
    /// Inline portion markings carried by this entity.
    pub portion_markings: Vec<String>,
    /// Compartments this entity is marked with.
    pub compartments: CompartmentSet,
}

/// The result of reducing a list of [`ClassifiedEntity`] values to a single
/// banner. `all_classifications` preserves input order; every other list is
/// sorted and deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Highest classification across all entities; `UNCLASSIFIED` if empty.
    pub highest_classification: ClassificationLevel,
    /// Every entity's classification, in input order.
    pub all_classifications: Vec<ClassificationLevel>,
    /// Union of portion markings, sorted ascending.
    pub all_portion_markings: Vec<String>,
    /// Union of compartment codes, sorted ascending.
    pub all_compartments: Vec<String>,
    /// When this aggregation was computed, RFC 3339.
    pub computed_at: String,
    /// Number of entities this result was computed from.
    pub computed_from_entity_count: usize,
    /// HMAC-SHA256 hex digest over the canonical signing payload, when a
    /// signing key was supplied.
    pub signature: Option<String>,
    /// The signature algorithm identifier, for forward compatibility.
    pub signature_algorithm: &'static str,
}

/// Reduce `entities` to a single [`AggregationResult`]. When `signing_key`
/// is supplied, signs the canonical payload
/// `{"all_compartments":[...],"all_portion_markings":[...],"count":n,"highest_classification":"<code>"}`
/// — timestamps and input order are excluded so the signature is stable
/// across reorderings and cacheable.
#[must_use]
pub fn aggregate(entities: &[ClassifiedEntity], signing_key: Option<&[u8]>) -> AggregationResult {
    let all_classifications: Vec<ClassificationLevel> =
        entities.iter().map(|e| e.classification).collect();

    let highest_classification = all_classifications
        .iter()
        .copied()
        .max()
        .unwrap_or(ClassificationLevel::Unclassified);

    let mut all_portion_markings: Vec<String> = entities
        .iter()
        .flat_map(|e| e.portion_markings.iter().cloned())
        .collect();
    all_portion_markings.sort();
    all_portion_markings.dedup();

    let mut all_compartments: Vec<String> = entities
        .iter()
        .flat_map(|e| e.compartments.iter().map(|c| c.code().to_string()))
        .collect();
    all_compartments.sort();
    all_compartments.dedup();

    let signature = signing_key.map(|key| {
        let payload = json!({
            "all_compartments": all_compartments,
            "all_portion_markings": all_portion_markings,
            "count": entities.len(),
            "highest_classification": highest_classification.code(),
        });
        hmac_sha256_hex(key, canonical_json(&payload).as_bytes())
    });

    AggregationResult {
        highest_classification,
        all_classifications,
        all_portion_markings,
        all_compartments,
        computed_at: rfc3339_now(),
        computed_from_entity_count: entities.len(),
        signature,
        signature_algorithm: "hmac-sha256",
    }
}
