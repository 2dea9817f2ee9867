//! Observability hooks: an optional decision observer, in-process decision
//! counters, and a process-global audit sink for tests and local debugging.
//!
//! None of this is required for the PDP to function — every hook here is
//! opt-in and every lock is non-blocking on the decision path (metrics and
//! audit capture are the only writers, and they never block a read of the
//! decision itself).

use std::sync::{Arc, Mutex, OnceLock, RwLock};

use serde::Serialize;
use uuid::Uuid;

use crate::pdp::Decision;

/// Observer invoked for every decision the PDP emits.
///
/// Install an implementation via [`set_observer`] to receive callbacks.
/// Implementations must be cheap and non-blocking; avoid I/O on this path.
/// Primarily intended for tests and in-process metrics/tracing bridges.
pub trait PolicyObserver: Send + Sync {
    /// Called once per `decide` call, after the decision is final.
    fn on_decision(&self, decision: &Decision);
}

static OBSERVER: OnceLock<RwLock<Option<Arc<dyn PolicyObserver>>>> = OnceLock::new();

/// Install or clear the global decision observer. Passing `None` clears it.
pub fn set_observer(observer: Option<Box<dyn PolicyObserver>>) {
    let cell = OBSERVER.get_or_init(|| RwLock::new(None));
    let mut w = cell.write().expect("observer write lock poisoned");
    *w = observer.map(Arc::from);
}

/// In-process counters for decisions, keyed by `{allowed, reason}`.
/// Low-cardinality by construction; not persisted across process restarts.
#[derive(Default)]
pub struct PolicyMetrics {
    inner: Mutex<std::collections::HashMap<String, u64>>,
}

impl PolicyMetrics {
    /// Current count for a given `(allowed, reason)` pair.
    pub fn decision_counter(&self, allowed: bool, reason: &str) -> u64 {
        let key = format!("{allowed}:{reason}");
        self.inner.lock().expect("metrics lock poisoned").get(&key).copied().unwrap_or(0)
    }

    fn inc(&self, allowed: bool, reason: &str) {
        let mut g = self.inner.lock().expect("metrics lock poisoned");
        *g.entry(format!("{allowed}:{reason}")).or_insert(0) += 1;
    }
}

static METRICS: OnceLock<PolicyMetrics> = OnceLock::new();

/// Access the global decision metrics registry.
pub fn policy_metrics() -> &'static PolicyMetrics {
    METRICS.get_or_init(PolicyMetrics::default)
}

/// A single audit entry, one per `decide`/`evaluate_and_render` call.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// The decision this record covers.
    pub decision_id: Uuid,
    /// The subject the decision was made for.
    pub subject_id: String,
    /// Whether access was granted.
    pub allowed: bool,
    /// The decision's reason string.
    pub reason: String,
    /// When the decision was made, RFC 3339.
    pub at: String,
}

/// Handle for draining captured audit records. Cheap to clone; thread-safe.
#[derive(Clone)]
pub struct AuditSink {
    inner: Arc<Mutex<Vec<AuditRecord>>>,
}

impl AuditSink {
    /// Drain and return every record captured since the last drain.
    pub fn drain(&self) -> Vec<AuditRecord> {
        let mut g = self.inner.lock().expect("audit lock poisoned");
        std::mem::take(&mut *g)
    }
}

static AUDIT: OnceLock<AuditSink> = OnceLock::new();

/// Install (or retrieve) the process-global audit sink.
pub fn install_audit_sink() -> AuditSink {
    if let Some(s) = AUDIT.get() {
        return s.clone();
    }
    let sink = AuditSink { inner: Arc::new(Mutex::new(Vec::new())) };
    let _ = AUDIT.set(sink.clone());
    sink
}

/// Record a finalized decision to the metrics registry and notify the
/// installed observer, if any. Called once per `decide` call, regardless of
/// whether `evaluate_and_render` or the caller's own enforcement point
/// eventually records an [`AuditRecord`].
pub(crate) fn record_decision(decision: &Decision) {
    policy_metrics().inc(decision.allowed, &decision.reason);
    tracing::debug!(
        decision_id = %decision.decision_id,
        allowed = decision.allowed,
        reason = %decision.reason,
        "policy decision"
    );
    if let Some(lock) = OBSERVER.get() {
        if let Ok(r) = lock.read() {
            if let Some(obs) = r.as_ref() {
                obs.on_decision(decision);
            }
        }
    }
}

/// Append `record` to the process-global audit sink, if one has been
/// installed via [`install_audit_sink`]. A no-op otherwise — installing the
/// sink is opt-in, typically from tests.
pub(crate) fn audit(record: AuditRecord) {
    if let Some(sink) = AUDIT.get() {
        sink.inner.lock().expect("audit lock poisoned").push(record);
    }
}
