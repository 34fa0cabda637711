//! Fan-out orchestrator implementation.
//!
//! Spawns one [`JobRunner`] per job into a task group sharing a single
//! admission gate and result lock, then joins every task before returning.

use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::concurrency::{AdmissionGate, ConcurrencyError, ResultLock};
use crate::fetcher::Fetcher;
use crate::job::{Job, JobFailure, JobOutcome};
use crate::metrics;
use crate::runner::{JobContext, JobRunner, StateObserver};
use crate::sink::{RunHeader, Sink};

use super::config::{ErrorPolicy, OrchestratorConfig};
use super::types::{OrchestratorError, RunSummary, TeardownStatus};

/// Runs a batch of jobs with bounded concurrency and serialized writes.
pub struct Orchestrator<S: Sink> {
    config: OrchestratorConfig,
    fetcher: Arc<dyn Fetcher>,
    lock: ResultLock<S>,
    observer: Option<StateObserver>,
}

impl<S: Sink> Orchestrator<S> {
    /// Create a new orchestrator owning `sink`.
    pub fn new(
        config: OrchestratorConfig,
        fetcher: Arc<dyn Fetcher>,
        sink: S,
    ) -> Result<Self, OrchestratorError> {
        if config.concurrency_limit == 0 {
            return Err(ConcurrencyError::InvalidCapacity(0).into());
        }

        Ok(Self {
            config,
            fetcher,
            lock: ResultLock::new(sink),
            observer: None,
        })
    }

    /// Report every job state transition to `observer`.
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The lock guarding the sink.
    pub fn sink(&self) -> &ResultLock<S> {
        &self.lock
    }

    /// Run every job to a terminal state.
    ///
    /// Runs take the orchestrator mutably, so the sink and its lock belong to
    /// one run at a time:
    ///
    /// ```rust,compile_fail
    /// use fanout_core::testing::{fixtures, RecordingSink};
    /// use fanout_core::Orchestrator;
    ///
    /// async fn overlapping(mut orchestrator: Orchestrator<RecordingSink>) {
    ///     let first = orchestrator.run(fixtures::jobs(3));
    ///     let second = orchestrator.run(fixtures::jobs(2));
    ///     let _ = tokio::join!(first, second);
    /// }
    /// ```
    pub async fn run(&mut self, jobs: Vec<Job>) -> Result<RunSummary, OrchestratorError> {
        self.run_until_cancelled(jobs, CancellationToken::new())
            .await
    }

    /// Run every job to a terminal state, cancelling in-flight jobs when
    /// `cancel` fires.
    ///
    /// Dropping the returned future aborts the task group; tokens and guards
    /// held by the aborted tasks are released as they are dropped.
    pub async fn run_until_cancelled(
        &mut self,
        jobs: Vec<Job>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, OrchestratorError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let gate = AdmissionGate::new(self.config.concurrency_limit)?;
        let policy = self.config.on_error;

        info!(
            %run_id,
            jobs = jobs.len(),
            concurrency_limit = self.config.concurrency_limit,
            on_error = %policy,
            hold_gate_during_write = self.config.hold_gate_during_write,
            "Starting run"
        );
        metrics::RUNS_TOTAL
            .with_label_values(&[policy.as_str()])
            .inc();

        self.begin_run(run_id).await?;

        let scope = cancel.child_token();
        let ctx = JobContext {
            gate: gate.clone(),
            lock: self.lock.clone(),
            fetcher: Arc::clone(&self.fetcher),
            hold_gate_during_write: self.config.hold_gate_during_write,
            cancel: scope.clone(),
            observer: self.observer.clone(),
        };

        let mut tasks = JoinSet::new();
        for job in jobs {
            let span = info_span!("job", job_id = %job.id, target = %job.target);
            let runner = JobRunner::new(job, ctx.clone());
            tasks.spawn(runner.run().instrument(span));
        }
        drop(ctx);

        let mut collector = RunCollector::new(policy, scope);
        while let Some(joined) = tasks.join_next().await {
            collector.absorb(joined);
        }

        let mut summary = collector.summary;
        summary.elapsed = started.elapsed();
        summary.teardown = TeardownStatus {
            gate_in_use: gate.in_use(),
            gate_waiting: gate.waiting(),
            lock_held: self.lock.is_held(),
        };

        if let Some(fatal) = collector.fatal {
            return Err(fatal);
        }

        if cancel.is_cancelled() {
            warn!(
                succeeded = summary.succeeded,
                cancelled = summary.cancelled,
                "Run cancelled"
            );
        }
        info!(
            %run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run finished"
        );

        Ok(summary)
    }

    /// Reinitialize the sink under the lock.
    async fn begin_run(&self, run_id: Uuid) -> Result<(), OrchestratorError> {
        let header = RunHeader::new(run_id);
        let mut sink = self.lock.acquire().await;
        let begun = sink.begin_run(&header).await;
        self.lock.release(sink)?;

        begun.map_err(|e| {
            error!(error = %e, "Failed to initialize sink");
            OrchestratorError::SinkInit(e)
        })
    }
}

/// Folds joined job tasks into a summary and keeps the first fatal error.
///
/// A panicked task or a lock discipline violation is fatal: the scope is
/// cancelled and the run reports an error once every task joined.
struct RunCollector {
    policy: ErrorPolicy,
    scope: CancellationToken,
    summary: RunSummary,
    fatal: Option<OrchestratorError>,
}

impl RunCollector {
    fn new(policy: ErrorPolicy, scope: CancellationToken) -> Self {
        Self {
            policy,
            scope,
            summary: RunSummary::default(),
            fatal: None,
        }
    }

    fn absorb(&mut self, joined: Result<JobOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Job task did not complete");
                self.fail_run(OrchestratorError::TaskPanicked(e.to_string()));
                return;
            }
        };

        match &outcome.result {
            Err(JobFailure::Concurrency(e)) => {
                error!(job_id = %outcome.job_id, error = %e, "Lock discipline violated");
                self.fail_run(OrchestratorError::Concurrency(e.clone()));
            }
            Err(e) if !e.is_cancelled() => {
                if self.policy == ErrorPolicy::Abort && !self.scope.is_cancelled() {
                    warn!(
                        job_id = %outcome.job_id,
                        "Job failed, cancelling remaining jobs"
                    );
                    self.scope.cancel();
                }
            }
            _ => {}
        }
        self.summary.record(outcome);
    }

    fn fail_run(&mut self, error: OrchestratorError) {
        self.scope.cancel();
        self.fatal.get_or_insert(error);
    }
}
