//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (terminal states, fetch duration)
//! - Contention (admission gate wait, result lock wait, write duration)
//! - Runs (started runs by failure policy)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs reaching a terminal state.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_jobs_total", "Jobs by terminal state"),
        &["state"], // "done", "failed", "cancelled"
    )
    .unwrap()
});

/// Fetch duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("fanout_fetch_duration_seconds", "Duration of fetch calls")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Contention
// =============================================================================

/// Time spent waiting for an admission slot.
pub static GATE_WAIT: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fanout_gate_wait_seconds",
            "Time spent waiting for admission",
        )
        .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Time spent waiting for the result lock.
pub static LOCK_WAIT: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fanout_lock_wait_seconds",
            "Time spent waiting for the result lock",
        )
        .buckets(vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0, 5.0]),
    )
    .unwrap()
});

/// Time spent inside the sink while holding the lock.
pub static WRITE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fanout_write_duration_seconds",
            "Duration of sink appends",
        )
        .buckets(vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0]),
    )
    .unwrap()
});

// =============================================================================
// Runs
// =============================================================================

/// Runs started, by failure policy.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_runs_total", "Runs started"),
        &["on_error"], // "continue", "abort"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(GATE_WAIT.clone()),
        Box::new(LOCK_WAIT.clone()),
        Box::new(WRITE_DURATION.clone()),
        Box::new(RUNS_TOTAL.clone()),
    ]
}
