//! Prometheus metrics for the riskd daemon.
//!
//! Provides observability for:
//! - Event throughput and sequencing drops
//! - Rule breaches
//! - Enforcement dispatches and escalations
//! - Lockout applications
//! - Contract cache behavior
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

/// Total events processed by the router, labeled by event kind and outcome.
pub static EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskd_events_total",
        "Total events processed by the router",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Out-of-order or duplicate events dropped by the sequence gate.
pub static SEQUENCE_DROPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "riskd_sequence_drops_total",
        "Events dropped by the per-account sequence gate"
    )
    .unwrap()
});

/// Rule breaches, labeled by rule name.
pub static RULE_BREACHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskd_rule_breaches_total",
        "Enforcement decisions produced by rules",
        &["rule"]
    )
    .unwrap()
});

/// Enforcement dispatches, labeled by action kind and outcome.
pub static ENFORCEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskd_enforcements_total",
        "Enforcement actions dispatched to the sink",
        &["action", "outcome"]
    )
    .unwrap()
});

/// Lockouts applied, labeled by kind.
pub static LOCKOUTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskd_lockouts_total",
        "Lockouts applied to accounts",
        &["kind"]
    )
    .unwrap()
});

/// Contract metadata cache activity, labeled by result
/// (hit / miss / coalesced / timeout / error).
pub static CONTRACT_CACHE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "riskd_contract_cache_total",
        "Contract metadata cache lookups",
        &["result"]
    )
    .unwrap()
});

/// End-to-end event processing latency in seconds.
pub static EVENT_LATENCY_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "riskd_event_latency_seconds",
        "Router event processing latency",
        vec![0.0005, 0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap()
});
