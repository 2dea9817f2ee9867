//! Policy Decision Point: the ordered, fail-closed access check pipeline and
//! decision-record assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use aegis_core::ids::rfc3339_now;

use crate::aggregate::{aggregate, ClassifiedEntity};
use crate::lattice::{join_codes, missing_compartments, ClassificationLevel};
use crate::model::{DecisionObligation, ObligationType, Policy, ResourceDescriptor, SubjectContext};
use crate::observe::{self, AuditRecord};
use crate::redact::apply_redaction;

/// The minimum classification rank that triggers MFA/audit obligations.
const SECRET_RANK: u8 = ClassificationLevel::Secret.rank();
/// The minimum classification rank that triggers an audit obligation.
const CUI_RANK: u8 = ClassificationLevel::Cui.rank();

/// Which of the five ordered checks produced a denial, for callers that want
/// to branch on more than the free-text reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `subject.account_suspended` was true.
    AccountSuspended,
    /// `subject.session_active` was false.
    SessionInactive,
    /// `subject.clearance` did not dominate `resource.classification`.
    InsufficientClearance,
    /// `resource.compartments` was not a subset of `subject.compartments`.
    MissingCompartments,
    /// `resource.need_to_know_attrs["required_roles"]` shared no role with the subject.
    NeedToKnowUnsatisfied,
}

/// The outcome of a single `decide` call. Emitted exactly once per call and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique id for this decision, for audit correlation.
    pub decision_id: Uuid,
    /// Whether access is granted.
    pub allowed: bool,
    /// Plain-English reason, deterministic per failing check.
    pub reason: String,
    /// Obligations an enforcement point must fulfill.
    pub obligations: Vec<DecisionObligation>,
    /// The resource's classification, echoed for banner rendering.
    pub highest_classification: Option<ClassificationLevel>,
    /// The resource's portion markings, echoed for banner rendering.
    pub portion_markings: Vec<String>,
    /// When this decision was made, RFC 3339.
    pub decided_at: String,
    /// Snapshot of the subject id this decision was made for.
    pub subject_id: String,
    /// Snapshot of the resource's classification code this decision was made for.
    pub resource_classification: ClassificationLevel,
}

impl Decision {
    /// The structured [`DenialReason`] this decision's `reason` string
    /// corresponds to, or `None` if `allowed` is true. Not carried on the
    /// wire; recomputed from `reason` for callers that want to branch
    /// without string matching.
    #[must_use]
    pub fn denial_reason(&self) -> Option<DenialReason> {
        if self.allowed {
            return None;
        }
        if self.reason == "User account is suspended" {
            Some(DenialReason::AccountSuspended)
        } else if self.reason == "Session is not active" {
            Some(DenialReason::SessionInactive)
        } else if self.reason.starts_with("Insufficient clearance") {
            Some(DenialReason::InsufficientClearance)
        } else if self.reason.starts_with("Missing compartments") {
            Some(DenialReason::MissingCompartments)
        } else {
            Some(DenialReason::NeedToKnowUnsatisfied)
        }
    }
}

fn deny(subject: &SubjectContext, resource: &ResourceDescriptor, reason: String) -> Decision {
    Decision {
        decision_id: Uuid::new_v4(),
        allowed: false,
        reason,
        obligations: Vec::new(),
        highest_classification: None,
        portion_markings: Vec::new(),
        decided_at: rfc3339_now(),
        subject_id: subject.user_id.clone(),
        resource_classification: resource.classification,
    }
}

/// Evaluate the ordered, fail-closed access pipeline (§ Access Decision
/// Point) for `subject` accessing `resource`, then derive the PDP's own
/// obligations (device-posture MFA, MFA-missing, audit). `_policy` is
/// accepted to match the documented `decide(subject, resource, policy)`
/// contract but is not consulted here: obligations derived from
/// field/portion rules are NOT merged into this result — they are a
/// separate query, see [`crate::redact::compute_obligations`]. Pure
/// function of its inputs modulo `decision_id`/`decided_at`.
#[must_use]
pub fn decide(subject: &SubjectContext, resource: &ResourceDescriptor, _policy: &Policy) -> Decision {
    if subject.account_suspended {
        let decision = deny(subject, resource, "User account is suspended".to_string());
        observe::record_decision(&decision);
        return decision;
    }
    if !subject.session_active {
        let decision = deny(subject, resource, "Session is not active".to_string());
        observe::record_decision(&decision);
        return decision;
    }
    if !subject.clearance.dominates(resource.classification) {
        let reason = format!(
            "Insufficient clearance: user has {}, resource requires {}",
            subject.clearance.code(),
            resource.classification.code()
        );
        let decision = deny(subject, resource, reason);
        observe::record_decision(&decision);
        return decision;
    }
    let missing = missing_compartments(&resource.compartments, &subject.compartments);
    if !missing.is_empty() {
        let missing_set = missing.into_iter().collect();
        let reason = format!("Missing compartments: {}", join_codes(&missing_set));
        let decision = deny(subject, resource, reason);
        observe::record_decision(&decision);
        return decision;
    }
    let required_roles = resource.required_roles();
    if !required_roles.is_empty() && !required_roles.iter().any(|r| subject.roles.contains(r)) {
        let decision = deny(subject, resource, "Need-to-know requirements not satisfied".to_string());
        observe::record_decision(&decision);
        return decision;
    }

    let mut obligations = Vec::new();
    if matches!(subject.device_posture, crate::model::DevicePosture::Untrusted)
        && resource.classification.rank() >= SECRET_RANK
    {
        obligations.push(DecisionObligation {
            obligation_type: ObligationType::RequireMfaStepUp,
            resource_field: None,
            redaction_strategy: None,
            reason: "Device is untrusted; Secret+ data requires additional MFA".to_string(),
        });
    }
    if resource.classification.rank() >= SECRET_RANK && !subject.mfa_verified {
        obligations.push(DecisionObligation {
            obligation_type: ObligationType::RequireMfaStepUp,
            resource_field: None,
            redaction_strategy: None,
            reason: "Secret+ data requires MFA verification".to_string(),
        });
    }
    if resource.classification.rank() >= CUI_RANK {
        obligations.push(DecisionObligation {
            obligation_type: ObligationType::AuditAccess,
            resource_field: None,
            redaction_strategy: None,
            reason: format!("Accessing {} data", resource.classification.code()),
        });
    }

    let decision = Decision {
        decision_id: Uuid::new_v4(),
        allowed: true,
        reason: "All access control checks passed".to_string(),
        obligations,
        highest_classification: Some(resource.classification),
        portion_markings: Vec::new(),
        decided_at: rfc3339_now(),
        subject_id: subject.user_id.clone(),
        resource_classification: resource.classification,
    };
    observe::record_decision(&decision);
    decision
}

/// Compose `decide` with redaction and aggregation: PDP + Redaction Engine +
/// Classification Aggregator in one call, returning the HTTP-shaped result
/// an enforcement point renders directly.
///
/// On allow, `headers` carries `X-Classification`, `X-Portion-Markings`
/// (empty string if none), and — only when `signing_key` is supplied —
/// `X-Classification-Signature`. On deny, `headers` is empty and `body` is
/// `{"error": reason}`.
#[must_use]
pub fn evaluate_and_render(
    subject: &SubjectContext,
    resource: &ResourceDescriptor,
    policy: &Policy,
    payload: &Value,
    signing_key: Option<&[u8]>,
) -> (bool, String, BTreeMap<String, String>, Value) {
    let decision = decide(subject, resource, policy);
    if !decision.allowed {
        observe::audit(AuditRecord {
            decision_id: decision.decision_id,
            subject_id: subject.user_id.clone(),
            allowed: false,
            reason: decision.reason.clone(),
            at: decision.decided_at.clone(),
        });
        let body = serde_json::json!({ "error": decision.reason });
        return (false, decision.reason, BTreeMap::new(), body);
    }

    let redacted = apply_redaction(payload, subject, policy);
    let mut entities = vec![ClassifiedEntity {
        classification: resource.classification,
        compartments: resource.compartments.clone(),
        portion_markings: Vec::new(),
    }];
    entities.extend(collect_classified_entities(&redacted));
    let banner = aggregate(&entities, signing_key);

    let mut headers = BTreeMap::new();
    headers.insert("X-Classification".to_string(), banner.highest_classification.code().to_string());
    headers.insert(
        "X-Portion-Markings".to_string(),
        banner.all_portion_markings.join(","),
    );
    if let Some(signature) = &banner.signature {
        headers.insert("X-Classification-Signature".to_string(), signature.clone());
    }

    observe::audit(AuditRecord {
        decision_id: decision.decision_id,
        subject_id: subject.user_id.clone(),
        allowed: true,
        reason: decision.reason.clone(),
        at: decision.decided_at.clone(),
    });

    (true, decision.reason, headers, redacted)
}

/// Walk `payload` (post-redaction) for sub-entities carrying their own
/// classification marking and fold them into the banner alongside the
/// resource's own entity — mirrors how the original demo layer aggregates
/// over an incident plus its `related_alerts`, generalized to any nested
/// object that looks like a classified entity.
///
/// An object counts as a classified entity iff its `classification` field
/// is a string that parses as a known [`ClassificationLevel`] code; unknown
/// codes or missing fields leave it out of the aggregation rather than
/// erroring, consistent with the tolerant payload-matching rule used
/// elsewhere (§ Redaction Engine path resolution).
fn collect_classified_entities(payload: &Value) -> Vec<ClassifiedEntity> {
    let mut found = Vec::new();
    walk_for_entities(payload, &mut found);
    found
}

fn walk_for_entities(value: &Value, out: &mut Vec<ClassifiedEntity>) {
    match value {
        Value::Object(map) => {
            if let Some(entity) = entity_from_object(map) {
                out.push(entity);
            }
            for child in map.values() {
                walk_for_entities(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_for_entities(item, out);
            }
        }
        _ => {}
    }
}

fn entity_from_object(map: &serde_json::Map<String, Value>) -> Option<ClassifiedEntity> {
    let classification = map
        .get("classification")
        .and_then(Value::as_str)
        .and_then(|code| ClassificationLevel::from_code(code).ok())?;
    let compartments = map
        .get("compartments")
        .and_then(Value::as_array)
        .map(|codes| {
            codes
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|code| crate::lattice::Compartment::from_code(code).ok())
                .collect()
        })
        .unwrap_or_default();
    let portion_markings = map
        .get("portion_markings")
        .and_then(Value::as_array)
        .map(|markings| markings.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Some(ClassifiedEntity { classification, compartments, portion_markings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Compartment, CompartmentSet};
    use crate::model::{DevicePosture, Policy};
    use std::collections::BTreeSet;

    fn subject() -> SubjectContext {
        SubjectContext {
            user_id: "u1".to_string(),
            clearance: ClassificationLevel::Secret,
            compartments: [Compartment::Noforn, Compartment::Humint].into_iter().collect(),
            roles: BTreeSet::new(),
            mfa_verified: true,
            account_suspended: false,
            session_active: true,
            device_posture: DevicePosture::Trusted,
        }
    }

    fn resource() -> ResourceDescriptor {
        ResourceDescriptor {
            classification: ClassificationLevel::Secret,
            compartments: [Compartment::Noforn, Compartment::Humint].into_iter().collect(),
            need_to_know_attrs: BTreeMap::new(),
        }
    }

    fn empty_policy() -> Policy {
        Policy::from_yaml_str("name: Demo\n").unwrap()
    }

    #[test]
    fn baseline_allow_emits_single_audit_obligation() {
        let decision = decide(&subject(), &resource(), &empty_policy());
        assert!(decision.allowed);
        assert_eq!(decision.reason, "All access control checks passed");
        assert_eq!(decision.obligations.len(), 1);
        assert_eq!(decision.obligations[0].obligation_type, ObligationType::AuditAccess);
    }

    #[test]
    fn missing_compartment_denies_with_sorted_codes() {
        let mut subj = subject();
        subj.compartments = CompartmentSet::new();
        subj.compartments.insert(Compartment::Noforn);
        let decision = decide(&subj, &resource(), &empty_policy());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Missing compartments: HUMINT");
        assert_eq!(decision.denial_reason(), Some(DenialReason::MissingCompartments));
    }

    #[test]
    fn suspended_account_wins_over_insufficient_clearance() {
        let mut subj = subject();
        subj.account_suspended = true;
        subj.clearance = ClassificationLevel::Unclassified;
        let decision = decide(&subj, &resource(), &empty_policy());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "User account is suspended");
    }

    #[test]
    fn untrusted_device_on_secret_plus_emits_both_mfa_and_audit() {
        let mut subj = subject();
        subj.device_posture = DevicePosture::Untrusted;
        let decision = decide(&subj, &resource(), &empty_policy());
        assert!(decision.allowed);
        let mfa_count = decision
            .obligations
            .iter()
            .filter(|o| o.obligation_type == ObligationType::RequireMfaStepUp)
            .count();
        assert_eq!(mfa_count, 1);
        assert!(decision.obligations[0].reason.contains("untrusted"));
        assert_eq!(decision.obligations.last().unwrap().obligation_type, ObligationType::AuditAccess);
    }

    #[test]
    fn insufficient_clearance_message_format() {
        let mut subj = subject();
        subj.clearance = ClassificationLevel::Cui;
        let decision = decide(&subj, &resource(), &empty_policy());
        assert_eq!(decision.reason, "Insufficient clearance: user has CUI, resource requires S");
    }

    #[test]
    fn need_to_know_denies_without_shared_role() {
        let mut res = resource();
        res.need_to_know_attrs.insert(
            "required_roles".to_string(),
            serde_json::json!(["analyst"]),
        );
        let decision = decide(&subject(), &res, &empty_policy());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Need-to-know requirements not satisfied");
    }

    #[test]
    fn need_to_know_allows_with_shared_role() {
        let mut res = resource();
        res.need_to_know_attrs.insert(
            "required_roles".to_string(),
            serde_json::json!(["analyst"]),
        );
        let mut subj = subject();
        subj.roles.insert("analyst".to_string());
        let decision = decide(&subj, &res, &empty_policy());
        assert!(decision.allowed);
    }

    #[test]
    fn evaluate_and_render_emits_classification_headers_on_allow() {
        let payload = serde_json::json!({"field": "value"});
        let (allowed, _, headers, body) =
            evaluate_and_render(&subject(), &resource(), &empty_policy(), &payload, None);
        assert!(allowed);
        assert_eq!(headers.get("X-Classification").unwrap(), "S");
        assert!(!headers.contains_key("X-Classification-Signature"));
        assert_eq!(body, payload);
    }

    #[test]
    fn evaluate_and_render_aggregates_classified_sub_entities_from_payload() {
        let payload = serde_json::json!({
            "incident": {"classification": "S"},
            "related_alerts": [
                {"classification": "TS", "portion_markings": ["//HUMINT"]},
                {"classification": "U"},
            ],
        });
        let (allowed, _, headers, _) =
            evaluate_and_render(&subject(), &resource(), &empty_policy(), &payload, None);
        assert!(allowed);
        assert_eq!(headers.get("X-Classification").unwrap(), "TS");
        assert_eq!(headers.get("X-Portion-Markings").unwrap(), "//HUMINT");
    }

    #[test]
    fn evaluate_and_render_emits_signature_header_when_key_given() {
        let payload = serde_json::json!({});
        let (allowed, _, headers, _) =
            evaluate_and_render(&subject(), &resource(), &empty_policy(), &payload, Some(b"key"));
        assert!(allowed);
        assert!(headers.contains_key("X-Classification-Signature"));
    }

    #[test]
    fn evaluate_and_render_body_is_error_object_on_deny() {
        let mut subj = subject();
        subj.session_active = false;
        let payload = serde_json::json!({"field": "value"});
        let (allowed, reason, headers, body) =
            evaluate_and_render(&subj, &resource(), &empty_policy(), &payload, None);
        assert!(!allowed);
        assert_eq!(reason, "Session is not active");
        assert!(headers.is_empty());
        assert_eq!(body, serde_json::json!({"error": "Session is not active"}));
    }
}
