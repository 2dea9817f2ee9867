//! Typed policy document: field/portion redaction rules, access obligation
//! declarations, and the `Policy` schema they live under.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PolicyError;
use crate::lattice::{ClassificationLevel, CompartmentSet};

/// Device posture reported alongside a subject's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosture {
    /// Device is enrolled and attested.
    Trusted,
    /// Device is known but not attested, or attestation failed.
    Untrusted,
    /// No posture signal was available.
    Unknown,
}

/// Everything the PDP knows about the entity requesting access.
#[derive(Debug, Clone)]
pub struct SubjectContext {
    /// Stable identifier for the subject, used only for audit/logging.
    pub user_id: String,
    /// The subject's held clearance.
    pub clearance: ClassificationLevel,
    /// Compartments the subject is read into.
    pub compartments: CompartmentSet,
    /// Roles held by the subject, consulted for need-to-know checks.
    pub roles: BTreeSet<String>,
    /// Whether the subject has completed MFA for the current session.
    pub mfa_verified: bool,
    /// Whether the subject's account is suspended.
    pub account_suspended: bool,
    /// Whether the subject's session is still active.
    pub session_active: bool,
    /// Posture of the device the subject is connecting from.
    pub device_posture: DevicePosture,
}

/// Everything the PDP knows about the resource being accessed.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// The resource's classification level.
    pub classification: ClassificationLevel,
    /// Compartments the resource is marked with.
    pub compartments: CompartmentSet,
    /// Need-to-know attributes, e.g. `{"required_roles": [...]}`. Opaque to
    /// the PDP beyond the `required_roles` key it reads for the need-to-know
    /// check; unrecognized keys are carried but not interpreted.
    pub need_to_know_attrs: BTreeMap<String, Value>,
}

impl ResourceDescriptor {
    /// Roles a subject must hold at least one of to satisfy need-to-know,
    /// read from `need_to_know_attrs["required_roles"]`. Absent or
    /// malformed data means no role restriction is imposed.
    #[must_use]
    pub fn required_roles(&self) -> Vec<String> {
        self.need_to_know_attrs
            .get("required_roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A resolved classification marking: level, compartments and portion
/// markings as they apply to a concrete entity or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMarking {
    /// Overall classification level.
    pub level: ClassificationLevel,
    /// Compartments this marking carries.
    pub compartments: CompartmentSet,
    /// Inline portion marking strings, e.g. `["//TS//SCI", "//NOFORN"]`.
    pub portion_markings: Vec<String>,
}

impl ClassificationMarking {
    /// Construct a marking from its parts.
    #[must_use]
    pub fn new(
        level: ClassificationLevel,
        compartments: CompartmentSet,
        portion_markings: Vec<String>,
    ) -> Self {
        Self { level, compartments, portion_markings }
    }
}

/// An obligation derived for a specific access decision (as opposed to
/// [`AccessObligation`], which is a policy-declared, unevaluated template).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionObligation {
    /// The kind of obligation.
    pub obligation_type: ObligationType,
    /// Dotted path of the resource field this obligation concerns, if any.
    #[serde(default)]
    pub resource_field: Option<String>,
    /// Redaction strategy to apply, for `MASK_FIELD`/`REDACT_PORTION`.
    #[serde(default)]
    pub redaction_strategy: Option<RedactionStrategy>,
    /// Human-readable reason this obligation was derived.
    pub reason: String,
}

/// A single segment of a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Matches a map entry by exact key.
    Key(String),
    /// Matches a map entry whose value must be a list; the remainder of the
    /// path is resolved independently against every element.
    Wildcard(String),
}

/// An ordered, pre-parsed sequence of [`PathSegment`]s, e.g.
/// `incident.affected_users[*].email`. Parsed once at policy-load time so
/// resolution against a payload never needs to re-parse or use reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct DottedPath {
    segments: Vec<PathSegment>,
    raw: String,
}

impl DottedPath {
    /// Parse a dotted path string. Segments are split on `.`; a segment
    /// ending in `[*]` is a list-wildcard. An empty path is invalid.
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        if raw.trim().is_empty() {
            return Err(PolicyError::EmptyDottedPath);
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(PolicyError::InvalidPathSegment(raw.to_string()));
            }
            if let Some(key) = part.strip_suffix("[*]") {
                if key.is_empty() {
                    return Err(PolicyError::InvalidPathSegment(raw.to_string()));
                }
                segments.push(PathSegment::Wildcard(key.to_string()));
            } else if part.contains('[') || part.contains(']') {
                return Err(PolicyError::InvalidPathSegment(raw.to_string()));
            } else {
                segments.push(PathSegment::Key(part.to_string()));
            }
        }
        Ok(Self { segments, raw: raw.to_string() })
    }

    /// The parsed segments, in path order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The original dotted-path string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<DottedPath> for String {
    fn from(value: DottedPath) -> Self {
        value.raw
    }
}

impl TryFrom<String> for DottedPath {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for DottedPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// How a matched value is transformed when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionStrategy {
    /// Replace with the literal `"[REDACTED]"`.
    MaskBrackets,
    /// Replace with the literal `"****"`.
    MaskAsterisks,
    /// Replace with the literal `"#####"`.
    MaskHash,
    /// Remove the key from its enclosing map.
    RemoveField,
    /// Keep a short prefix/suffix of a string, mask the rest.
    Truncate,
}

/// A field-level redaction rule resolved against a dotted path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRedactionRule {
    /// Dotted path into the payload this rule targets.
    pub field_path: DottedPath,
    /// Descriptive field type (e.g. `"email"`), not interpreted by the engine.
    pub field_type: String,
    /// Masking/removal strategy applied when the rule fires.
    #[serde(default = "default_field_strategy")]
    pub strategy: RedactionStrategy,
    /// Minimum clearance required to avoid redaction.
    #[serde(default)]
    pub required_clearance: Option<ClassificationLevel>,
    /// Compartments required to avoid redaction.
    #[serde(default)]
    pub required_compartments: CompartmentSet,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form tags for policy authoring/reporting.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_field_strategy() -> RedactionStrategy {
    RedactionStrategy::MaskBrackets
}

impl FieldRedactionRule {
    /// Validate the rule's invariant: at least one of `required_clearance`
    /// or `required_compartments` must be set, else the rule is a no-op.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.required_clearance.is_none() && self.required_compartments.is_empty() {
            return Err(PolicyError::VacuousFieldRule(self.field_path.as_str().to_string()));
        }
        Ok(())
    }
}

/// A portion-level redaction rule (targets a named portion of a document).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortionRedactionRule {
    /// Name of the portion this rule targets (matched by field key).
    pub portion_name: String,
    /// Inline portion marking string, e.g. `"//TS//SCI"`.
    pub portion_marking: String,
    /// Minimum clearance required to avoid redaction.
    pub minimum_clearance: ClassificationLevel,
    /// Compartments required to avoid redaction.
    #[serde(default)]
    pub required_compartments: CompartmentSet,
    /// Masking/removal strategy; portion rules default to full removal.
    #[serde(default = "default_portion_strategy")]
    pub strategy: RedactionStrategy,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form tags for policy authoring/reporting.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_portion_strategy() -> RedactionStrategy {
    RedactionStrategy::RemoveField
}

/// The kind of obligation an enforcement point must fulfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationType {
    /// Mask a specific field of the response payload.
    MaskField,
    /// Redact a named portion of the response payload.
    RedactPortion,
    /// Require the subject to complete a step-up MFA challenge.
    RequireMfaStepUp,
    /// Require out-of-band human approval before proceeding.
    RequireApproval,
    /// Record an audit event for this access.
    AuditAccess,
    /// Prevent the response from being exported outside the system.
    RestrictExport,
    /// Prevent the response from being copied/duplicated.
    RestrictCopy,
    /// Apply a visible watermark to the rendered response.
    Watermark,
}

/// A policy-declared obligation. Schema-only: the PDP does not interpret
/// these (obligations derived from field/portion rules are a separate query,
/// see [`crate::redact::compute_obligations`]); a policy document can still
/// declare them and round-trip them without data loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessObligation {
    /// Unique id for this obligation declaration.
    #[serde(default = "Uuid::new_v4")]
    pub obligation_id: Uuid,
    /// The kind of obligation.
    pub obligation_type: ObligationType,
    /// Human-readable description.
    pub description: String,
    /// Free-text condition under which this obligation applies.
    pub triggered_when: String,
    /// Declared action identifier (enforcement-point specific).
    pub action: String,
    /// Parameters for `action`.
    #[serde(default)]
    pub action_params: BTreeMap<String, Value>,
    /// Creation timestamp, RFC 3339.
    #[serde(default = "aegis_core::ids::rfc3339_now")]
    pub created_at: String,
    /// Who declared this obligation, if known.
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

/// Scope under which a policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyScope {
    /// Applies to every request.
    Global,
    /// Applies only to subjects holding one of `applicable_roles`.
    RoleBased,
    /// Applies based on resource/subject attributes beyond role.
    AttributeBased,
    /// Applies only to a specific resource class.
    ResourceBased,
}

/// A typed policy document: field-redaction rules, portion-redaction rules,
/// declared obligations, and scope. Long-lived and caller-owned; the engine
/// only ever holds a shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Policy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Field-level redaction rules, applied in declaration order.
    #[serde(default)]
    pub field_rules: Vec<FieldRedactionRule>,
    /// Portion-level redaction rules.
    #[serde(default)]
    pub portion_rules: Vec<PortionRedactionRule>,
    /// Declared (inert) access obligations.
    #[serde(default)]
    pub obligations: Vec<AccessObligation>,
    /// Scope under which this policy applies.
    #[serde(default = "default_scope")]
    pub scope: PolicyScope,
    /// Roles this policy applies to, when `scope == ROLE_BASED`.
    #[serde(default)]
    pub applicable_roles: std::collections::BTreeSet<String>,
    /// Whether the policy is currently active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether the policy is enforced (vs. shadow mode). In shadow mode the
    /// PDP still evaluates the policy but must not emit denial or obligation
    /// decisions derived solely from it.
    #[serde(default = "default_true")]
    pub is_enforced: bool,
    /// Who created this policy, if known.
    #[serde(default)]
    pub created_by: Option<Uuid>,
    /// Who last modified this policy, if known.
    #[serde(default)]
    pub last_modified_by: Option<Uuid>,
}

fn default_scope() -> PolicyScope {
    PolicyScope::Global
}

fn default_true() -> bool {
    true
}

impl Policy {
    /// Validate every field rule's invariant. Called automatically by the
    /// `from_*` constructors; exposed for callers that build a `Policy`
    /// programmatically instead of deserializing one.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for rule in &self.field_rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Parse and validate a policy document from a YAML string.
    pub fn from_yaml_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_yaml::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parse and validate a policy document from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_json::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load, parse and validate a policy document from a YAML file.
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }
}
