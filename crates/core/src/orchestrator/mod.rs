//! Fan-out orchestrator.
//!
//! Runs a batch of jobs concurrently:
//! - **Admission**: at most `concurrency_limit` jobs fetch at once (FIFO)
//! - **Writes**: serialized through a single lock around the sink
//! - **Failures**: isolated per job, or cancel all siblings under `abort`

mod config;
mod runner;
mod types;

pub use config::{ErrorPolicy, OrchestratorConfig};
pub use runner::Orchestrator;
pub use types::{FailedJob, OrchestratorError, RunSummary, TeardownStatus};
