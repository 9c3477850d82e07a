//! Malicious-behaviour reporting seam.
//!
//! Markers are observability, not control flow: registering one never halts
//! a process. Operational tooling watches the counter and decides whether a
//! relayer should be paused.

pub const MALICIOUS_BEHAVIOUR_METRIC: &str = "relayer_malicious_behaviour_total";

pub trait MaliciousBehaviourRegistry: Send + Sync {
    /// Record an observation under a stable key (a transaction hash, or a
    /// composite such as `invalid_signature_for_operation_<id>_relayer_<addr>`).
    fn register(&self, key: &str);
}

/// Production implementation: a labelled counter plus a warning log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsRegistry;

impl MaliciousBehaviourRegistry for MetricsRegistry {
    fn register(&self, key: &str) {
        tracing::warn!(key, "malicious behaviour observed");
        metrics::counter!(MALICIOUS_BEHAVIOUR_METRIC, "key" => key.to_owned()).increment(1);
    }
}
