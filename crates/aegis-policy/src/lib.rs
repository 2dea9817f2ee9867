//! Aegis Policy Engine
//!
//! A deterministic, fail-secure classification-access-control and redaction
//! engine. Given a [`SubjectContext`] (clearance, compartments, session and
//! device state) and a [`ResourceDescriptor`] (classification, compartments,
//! need-to-know attributes), the Policy Decision Point produces a
//! [`Decision`]: allow or deny, plus the obligations an enforcement point
//! must fulfill (step-up MFA, audit, masking).
//!
//! Three tightly-coupled subsystems make up the engine:
//! - [`pdp`] — the ordered, fail-closed access check pipeline and obligation
//!   derivation.
//! - [`redact`] — resolves dotted field paths (including list-wildcard
//!   segments) against arbitrary JSON payloads and applies masking/removal
//!   strategies.
//! - [`aggregate`] — reduces a list of classified entities to a single
//!   banner, optionally HMAC-signed for cache stability.
//!
//! Supporting modules: [`lattice`] (classification levels and compartments),
//! [`model`] (the typed `Policy` document and its rule types), [`error`]
//! (validation-time failures), and [`observe`] (opt-in decision observer,
//! metrics, and audit sink).
//!
//! Precedence and determinism, mirrored from §4.1 of the access control
//! design:
//! 1. Account status — suspended accounts are denied before anything else.
//! 2. Session status.
//! 3. Clearance dominance.
//! 4. Compartment containment.
//! 5. Need-to-know (role intersection).
//!
//! On allow, obligations are derived independently, in fixed order: device
//! posture before MFA-missing before audit. The PDP never throws on a
//! well-formed `Policy`; it is a pure function of its inputs modulo
//! `decision_id`/`decided_at`. Every operation is synchronous and
//! side-effect free beyond the opt-in observability hooks in [`observe`].
//!
//! Observability:
//! - Every `decide` call records a low-cardinality counter keyed by
//!   `(allowed, reason)` via [`observe::policy_metrics`].
//! - An optional [`observe::PolicyObserver`] can be installed to observe
//!   decisions in-process.
//! - A process-global [`observe::AuditSink`] captures [`observe::AuditRecord`]s
//!   for later inspection in tests and local debugging.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod error;
pub mod lattice;
pub mod model;
pub mod observe;
pub mod pdp;
pub mod redact;

pub use aggregate::{aggregate, AggregationResult, ClassifiedEntity};
pub use error::PolicyError;
pub use lattice::{join_codes, missing_compartments, ClassificationLevel, Compartment, CompartmentSet};
pub use model::{
    AccessObligation, ClassificationMarking, DecisionObligation, DevicePosture, DottedPath,
    FieldRedactionRule, ObligationType, PathSegment, Policy, PolicyScope, PortionRedactionRule,
    RedactionStrategy, ResourceDescriptor, SubjectContext,
};
pub use observe::{install_audit_sink, policy_metrics, set_observer, AuditRecord, AuditSink, PolicyMetrics, PolicyObserver};
pub use pdp::{decide, evaluate_and_render, DenialReason, Decision};
pub use redact::{apply_redaction, compute_obligations, should_redact};
