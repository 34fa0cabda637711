//! Append-only result storage.
//!
//! A [`Sink`] is never called concurrently: every call happens while the
//! caller holds the run's [`ResultLock`](crate::concurrency::ResultLock),
//! which is why the methods take `&mut self`.

mod error;
mod json_lines;

pub use error::SinkError;
pub use json_lines::{read_results, JsonLinesSink, ResultsFile};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::FetchResult;

/// Marks the start of a run.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
}

impl RunHeader {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Local::now(),
        }
    }

    /// Timestamp as written to the results file.
    pub fn run_timestamp(&self) -> String {
        self.started_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// One persisted line per successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub target: String,
    pub elapsed_seconds: f64,
}

impl From<&FetchResult> for SinkRecord {
    fn from(result: &FetchResult) -> Self {
        Self {
            target: result.target.clone(),
            elapsed_seconds: result.elapsed_seconds(),
        }
    }
}

/// Durable, append-only store of fetch results.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Reset the store for a new run.
    async fn begin_run(&mut self, header: &RunHeader) -> Result<(), SinkError>;

    /// Append one record after every previously appended one.
    async fn append(&mut self, result: &FetchResult) -> Result<(), SinkError>;
}
