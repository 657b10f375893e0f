use crate::model::EventKind;
use crate::watch::WatchState;

// Metric name constants
pub const REGISTRY_EVENTS: &str = "registry_events_total";
pub const LIFECYCLE_FAILURES: &str = "lifecycle_failures_total";
pub const MANAGED_SERVICES: &str = "managed_services";
pub const WATCH_EXITS: &str = "watch_exits_total";
pub const BREAKER_TRANSITIONS: &str = "breaker_transitions_total";

/// Counts one dispatched registry event.
pub fn add_event(kind: EventKind) {
    metrics::counter!(REGISTRY_EVENTS, "kind" => kind.as_str()).increment(1);
}

/// Counts one failed lifecycle step (create, register, initialize, ...).
pub fn add_lifecycle_failure(step: &'static str) {
    metrics::counter!(LIFECYCLE_FAILURES, "step" => step).increment(1);
}

/// Sets the number of services currently under orchestration.
pub fn set_managed_services(n: usize) {
    metrics::gauge!(MANAGED_SERVICES).set(n as f64);
}

/// Counts a watch loop exit by terminal state.
pub fn add_watch_exit(state: WatchState) {
    metrics::counter!(WATCH_EXITS, "state" => state.as_str()).increment(1);
}

/// Counts a circuit breaker transition ("open" or "close").
pub fn add_breaker_transition(to: &'static str) {
    metrics::counter!(BREAKER_TRANSITIONS, "to" => to).increment(1);
}
