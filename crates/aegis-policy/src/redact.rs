//! Payload redaction: dotted-path resolution against a `serde_json::Value`
//! tree and field/portion rule application.

use serde_json::Value;

use crate::lattice::missing_compartments;
use crate::model::{
    DecisionObligation, FieldRedactionRule, ObligationType, PathSegment, Policy,
    PortionRedactionRule, RedactionStrategy, SubjectContext,
};

/// Render the literal replacement value for a redaction strategy applied to
/// `original` (only consulted by [`RedactionStrategy::Truncate`]).
fn redacted_value(strategy: RedactionStrategy, original: &Value) -> Option<Value> {
    match strategy {
        RedactionStrategy::MaskBrackets => Some(Value::String("[REDACTED]".to_string())),
        RedactionStrategy::MaskAsterisks => Some(Value::String("****".to_string())),
        RedactionStrategy::MaskHash => Some(Value::String("#####".to_string())),
        RedactionStrategy::RemoveField => None,
        RedactionStrategy::Truncate => {
            if let Value::String(s) = original {
                if s.chars().count() > 6 {
                    let chars: Vec<char> = s.chars().collect();
                    let first: String = chars[..3].iter().collect();
                    let last: String = chars[chars.len() - 3..].iter().collect();
                    Some(Value::String(format!("{first}...{last}")))
                } else {
                    Some(Value::String("[REDACTED]".to_string()))
                }
            } else {
                Some(Value::String("[REDACTED]".to_string()))
            }
        }
    }
}

/// Whether `subject` lacks the clearance and/or compartments required to
/// view a field guarded by `required_clearance`/`required_compartments`.
///
/// OR semantics: a clearance deficiency alone, or a compartment deficiency
/// alone, is sufficient to redact — the subject must satisfy both
/// dimensions to avoid redaction.
#[must_use]
pub fn should_redact(
    required_clearance: Option<crate::lattice::ClassificationLevel>,
    required_compartments: &crate::lattice::CompartmentSet,
    subject: &SubjectContext,
) -> bool {
    let clearance_deficient = required_clearance
        .is_some_and(|required| !subject.clearance.dominates(required));
    let compartment_deficient =
        !missing_compartments(required_compartments, &subject.compartments).is_empty();
    clearance_deficient || compartment_deficient
}

/// Apply every field rule in `policy` to `payload`, in declaration order.
/// Paths that don't resolve against `payload` are silently skipped — a
/// policy author targeting a field a given resource doesn't have is not an
/// error. Later rules observe the rewrites made by earlier rules.
///
/// Portion rules are deliberately *not* applied here: whether `REMOVE_FIELD`
/// on a portion should delete its subtree is unspecified upstream, so
/// portion rules surface only as `REDACT_PORTION` obligations (see
/// [`compute_obligations`]) and never mutate the payload.
#[must_use]
pub fn apply_redaction(payload: &Value, subject: &SubjectContext, policy: &Policy) -> Value {
    let mut out = payload.clone();
    if !policy.is_enforced {
        return out;
    }
    for rule in &policy.field_rules {
        if should_redact(rule.required_clearance, &rule.required_compartments, subject) {
            apply_field_rule(&mut out, rule);
        }
    }
    out
}

fn should_redact_portion(rule: &PortionRedactionRule, subject: &SubjectContext) -> bool {
    should_redact(Some(rule.minimum_clearance), &rule.required_compartments, subject)
}

fn apply_field_rule(value: &mut Value, rule: &FieldRedactionRule) {
    apply_segments(value, rule.field_path.segments(), rule.strategy);
}

fn apply_segments(value: &mut Value, segments: &[PathSegment], strategy: RedactionStrategy) {
    let Some((head, rest)) = segments.split_first() else { return };
    match head {
        PathSegment::Key(key) => {
            let Value::Object(map) = value else { return };
            if rest.is_empty() {
                if let Some(existing) = map.get(key) {
                    match redacted_value(strategy, existing) {
                        Some(replacement) => {
                            map.insert(key.clone(), replacement);
                        }
                        None => {
                            map.remove(key);
                        }
                    }
                }
            } else if let Some(child) = map.get_mut(key) {
                apply_segments(child, rest, strategy);
            }
        }
        PathSegment::Wildcard(key) => {
            let Value::Object(map) = value else { return };
            if let Some(Value::Array(items)) = map.get_mut(key) {
                for item in items.iter_mut() {
                    apply_segments(item, rest, strategy);
                }
            }
        }
    }
}

/// Derive the obligations an enforcement point must fulfill for `subject`
/// accessing a resource governed by `policy`, independent of payload shape.
/// Field redaction obligations are emitted in rule declaration order.
#[must_use]
pub fn compute_obligations(subject: &SubjectContext, policy: &Policy) -> Vec<DecisionObligation> {
    let mut obligations = Vec::new();
    if !policy.is_enforced {
        return obligations;
    }
    for rule in &policy.field_rules {
        if should_redact(rule.required_clearance, &rule.required_compartments, subject) {
            obligations.push(DecisionObligation {
                obligation_type: ObligationType::MaskField,
                resource_field: Some(rule.field_path.as_str().to_string()),
                redaction_strategy: Some(rule.strategy),
                reason: format!("field '{}' exceeds subject's clearance/compartments", rule.field_path.as_str()),
            });
        }
    }
    for rule in &policy.portion_rules {
        if should_redact_portion(rule, subject) {
            obligations.push(DecisionObligation {
                obligation_type: ObligationType::RedactPortion,
                resource_field: Some(rule.portion_name.clone()),
                redaction_strategy: Some(rule.strategy),
                reason: format!("portion '{}' exceeds subject's clearance/compartments", rule.portion_name),
            });
        }
    }
    obligations
}
