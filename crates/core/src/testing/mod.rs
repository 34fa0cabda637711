//! Testing utilities and mock implementations.
//!
//! This module provides a controllable [`Fetcher`](crate::fetcher::Fetcher)
//! and an in-memory [`Sink`](crate::sink::Sink), allowing whole runs to be
//! tested without network or disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanout_core::testing::{fixtures, MockFetcher, RecordingSink};
//!
//! let fetcher = MockFetcher::with_default_delay(Duration::from_secs(2));
//! let sink = RecordingSink::new();
//!
//! let mut orchestrator = Orchestrator::new(config, Arc::new(fetcher.clone()), sink.clone())?;
//! let summary = orchestrator.run(fixtures::jobs(10)).await?;
//!
//! assert!(!sink.overlap_detected());
//! ```

mod mock_fetcher;
mod recording_sink;

pub use mock_fetcher::MockFetcher;
pub use recording_sink::{RecordingSink, WriteSpan};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::time::Duration;

    use crate::job::{FetchResult, Job};

    /// Target used for the job at `index`.
    pub fn target(index: usize) -> String {
        format!("http://mock.local/job/{index}")
    }

    /// `count` jobs with ids `job-0..` and distinct targets.
    pub fn jobs(count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| Job::new(format!("job-{i}"), target(i)))
            .collect()
    }

    /// A successful result with the given elapsed time.
    pub fn fetch_result(target: &str, elapsed: Duration) -> FetchResult {
        FetchResult {
            job_id: target.to_string(),
            target: target.to_string(),
            elapsed,
            payload_summary: String::new(),
        }
    }
}
