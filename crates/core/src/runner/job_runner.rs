//! Drives a single job through its lifecycle.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::concurrency::{AdmissionGate, ResultLock};
use crate::fetcher::Fetcher;
use crate::job::{FetchResult, Job, JobFailure, JobOutcome, JobState};
use crate::metrics;
use crate::sink::Sink;

/// Called on every state transition of every job.
pub type StateObserver = Arc<dyn Fn(&Job, JobState) + Send + Sync>;

/// Shared resources a job runs against.
pub struct JobContext<S> {
    pub gate: AdmissionGate,
    pub lock: ResultLock<S>,
    pub fetcher: Arc<dyn Fetcher>,
    /// Keep the admission token until the write finished.
    pub hold_gate_during_write: bool,
    pub cancel: CancellationToken,
    pub observer: Option<StateObserver>,
}

impl<S> Clone for JobContext<S> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            lock: self.lock.clone(),
            fetcher: Arc::clone(&self.fetcher),
            hold_gate_during_write: self.hold_gate_during_write,
            cancel: self.cancel.clone(),
            observer: self.observer.clone(),
        }
    }
}

/// Runs one job: admission, fetch, then a write under the result lock.
///
/// Cancellation is honored while waiting for admission, while fetching and
/// while waiting for the lock. A write that has started runs to completion so
/// no record is left half-written.
pub struct JobRunner<S> {
    job: Job,
    ctx: JobContext<S>,
    state: JobState,
}

impl<S: Sink> JobRunner<S> {
    pub fn new(job: Job, ctx: JobContext<S>) -> Self {
        Self {
            job,
            ctx,
            state: JobState::Pending,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run to a terminal state.
    pub async fn run(mut self) -> JobOutcome {
        let result = self.drive().await;
        let outcome = JobOutcome {
            job_id: self.job.id.clone(),
            target: self.job.target.clone(),
            result,
        };
        self.transition(outcome.state());

        match &outcome.result {
            Ok(result) => debug!(
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Job written"
            ),
            Err(JobFailure::Cancelled) => debug!("Job cancelled"),
            Err(e) => warn!(
                job_id = %self.job.id,
                target = %self.job.target,
                error = %e,
                "Job failed"
            ),
        }
        metrics::JOBS_TOTAL
            .with_label_values(&[outcome.state().as_str()])
            .inc();

        outcome
    }

    fn transition(&mut self, next: JobState) {
        debug!(from = %self.state, to = %next, "Job state");
        self.state = next;
        if let Some(observer) = &self.ctx.observer {
            observer(&self.job, next);
        }
    }

    async fn drive(&mut self) -> Result<FetchResult, JobFailure> {
        let cancel = self.ctx.cancel.clone();

        // Admission
        self.transition(JobState::AdmissionWait);
        let wait_started = Instant::now();
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobFailure::Cancelled),
            token = self.ctx.gate.acquire() => token?,
        };
        metrics::GATE_WAIT.observe(wait_started.elapsed().as_secs_f64());
        debug!(gate = %self.ctx.gate.status(), "Admitted");

        // Fetch (token is dropped on every early return)
        self.transition(JobState::Fetching);
        let fetch_started = Instant::now();
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobFailure::Cancelled),
            fetched = self.ctx.fetcher.fetch(&self.job.target) => fetched,
        };
        let elapsed = fetch_started.elapsed();

        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::FETCH_DURATION
                    .with_label_values(&["error"])
                    .observe(elapsed.as_secs_f64());
                self.ctx.gate.release(token)?;
                return Err(e.into());
            }
        };
        metrics::FETCH_DURATION
            .with_label_values(&["success"])
            .observe(elapsed.as_secs_f64());
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Response received");

        let result = FetchResult {
            job_id: self.job.id.clone(),
            target: self.job.target.clone(),
            elapsed,
            payload_summary: outcome.summary,
        };

        let held = if self.ctx.hold_gate_during_write {
            Some(token)
        } else {
            self.ctx.gate.release(token)?;
            None
        };

        // Serialized write
        self.transition(JobState::LockWait);
        let lock_started = Instant::now();
        let mut guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobFailure::Cancelled),
            guard = self.ctx.lock.acquire() => guard,
        };
        metrics::LOCK_WAIT.observe(lock_started.elapsed().as_secs_f64());

        self.transition(JobState::Writing);
        let write_started = Instant::now();
        let written = guard.append(&result).await;
        metrics::WRITE_DURATION.observe(write_started.elapsed().as_secs_f64());
        self.ctx.lock.release(guard)?;

        if let Some(token) = held {
            self.ctx.gate.release(token)?;
        }

        written?;
        Ok(result)
    }
}
