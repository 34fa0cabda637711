//! Types for the orchestrator.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::concurrency::ConcurrencyError;
use crate::job::{FetchResult, JobFailure, JobOutcome};
use crate::sink::SinkError;

/// Errors that end a whole run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid gate capacity or a lock discipline violation.
    #[error("concurrency error: {0}")]
    Concurrency(#[from] ConcurrencyError),

    /// The sink could not be reinitialized, so nothing can be written.
    #[error("sink initialization failed: {0}")]
    SinkInit(SinkError),

    /// A job task panicked.
    #[error("job task panicked: {0}")]
    TaskPanicked(String),
}

/// A job that did not complete, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub job_id: String,
    pub target: String,
    /// `fetch`, `sink` or `concurrency`.
    pub kind: &'static str,
    pub error: String,
}

/// Resource state observed after every job task joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownStatus {
    pub gate_in_use: usize,
    pub gate_waiting: usize,
    pub lock_held: bool,
}

impl TeardownStatus {
    /// No slot is occupied, nobody waits and the lock is free.
    pub fn is_clean(&self) -> bool {
        self.gate_in_use == 0 && self.gate_waiting == 0 && !self.lock_held
    }
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Successful results in completion order.
    pub results: Vec<FetchResult>,
    pub failures: Vec<FailedJob>,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub teardown: TeardownStatus,
}

impl RunSummary {
    /// Fold one job outcome into the summary.
    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome.result {
            Ok(result) => {
                self.succeeded += 1;
                self.results.push(result);
            }
            Err(JobFailure::Cancelled) => self.cancelled += 1,
            Err(e) => {
                self.failed += 1;
                self.failures.push(FailedJob {
                    job_id: outcome.job_id,
                    target: outcome.target,
                    kind: e.kind(),
                    error: e.to_string(),
                });
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
