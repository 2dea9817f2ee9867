use aegis_policy::{
    apply_redaction, compute_obligations, ClassificationLevel, Compartment, CompartmentSet,
    DevicePosture, ObligationType, Policy, SubjectContext,
};
use serde_json::json;
use std::collections::BTreeSet;

fn subject(clearance: ClassificationLevel, compartments: CompartmentSet) -> SubjectContext {
    SubjectContext {
        user_id: "analyst-1".to_string(),
        clearance,
        compartments,
        roles: BTreeSet::new(),
        mfa_verified: true,
        account_suspended: false,
        session_active: true,
        device_posture: DevicePosture::Trusted,
    }
}

fn wildcard_policy() -> Policy {
    Policy::from_yaml_str(
        r#"
name: Wildcard Redaction
field_rules:
  - field_path: "incident.affected_users[*].email"
    field_type: "email"
    strategy: MASK_BRACKETS
    required_clearance: "S"
    required_compartments: ["HUMINT"]
"#,
    )
    .unwrap()
}

fn incident_payload() -> serde_json::Value {
    json!({
        "incident": {
            "affected_users": [
                {"name": "A", "email": "a@example.com"},
                {"name": "B", "email": "b@example.com"},
            ]
        }
    })
}

#[test]
fn wildcard_rule_redacts_every_list_element_when_compartment_missing() {
    let policy = wildcard_policy();
    let subj = subject(ClassificationLevel::Secret, [Compartment::Noforn].into_iter().collect());
    let out = apply_redaction(&incident_payload(), &subj, &policy);

    let users = out["incident"]["affected_users"].as_array().unwrap();
    assert_eq!(users[0]["email"], json!("[REDACTED]"));
    assert_eq!(users[1]["email"], json!("[REDACTED]"));
    assert_eq!(users[0]["name"], json!("A"));
    assert_eq!(users[1]["name"], json!("B"));

    let obligations = compute_obligations(&subj, &policy);
    assert_eq!(obligations.len(), 1);
    assert_eq!(obligations[0].obligation_type, ObligationType::MaskField);
}

#[test]
fn wildcard_rule_leaves_payload_untouched_when_subject_qualifies() {
    let policy = wildcard_policy();
    let subj = subject(
        ClassificationLevel::Secret,
        [Compartment::Noforn, Compartment::Humint].into_iter().collect(),
    );
    let out = apply_redaction(&incident_payload(), &subj, &policy);
    assert_eq!(out, incident_payload());
    assert!(compute_obligations(&subj, &policy).is_empty());
}

#[test]
fn non_list_value_at_wildcard_segment_is_skipped_silently() {
    let policy = wildcard_policy();
    let payload = json!({"incident": {"affected_users": "not-a-list"}});
    let subj = subject(ClassificationLevel::Unclassified, CompartmentSet::new());
    let out = apply_redaction(&payload, &subj, &policy);
    assert_eq!(out, payload);
}

#[test]
fn portion_rule_on_clearance_dominance_alone_emits_redact_portion() {
    let policy = Policy::from_yaml_str(
        r#"
name: Portion Redaction
portion_rules:
  - portion_name: "source_identity"
    portion_marking: "//TS//SCI"
    minimum_clearance: "TS"
"#,
    )
    .unwrap();

    let deficient = subject(ClassificationLevel::Secret, CompartmentSet::new());
    let obligations = compute_obligations(&deficient, &policy);
    assert_eq!(obligations.len(), 1);
    assert_eq!(obligations[0].obligation_type, ObligationType::RedactPortion);
    assert_eq!(obligations[0].resource_field.as_deref(), Some("source_identity"));

    let qualified = subject(ClassificationLevel::TsSci, CompartmentSet::new());
    assert!(compute_obligations(&qualified, &policy).is_empty());
}
