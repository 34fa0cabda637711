//! Types for jobs and their outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::concurrency::ConcurrencyError;
use crate::fetcher::FetchError;
use crate::sink::SinkError;

/// An opaque unit of work. Ids need not be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub target: String,
}

impl Job {
    pub fn new(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
        }
    }
}

/// Produced once per successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub job_id: String,
    pub target: String,
    #[serde(rename = "elapsed_seconds", with = "duration_secs")]
    pub elapsed: Duration,
    pub payload_summary: String,
}

impl FetchResult {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Lifecycle of a single job.
///
/// `Pending → AdmissionWait → Fetching → LockWait → Writing → Done`, with
/// `Failed` reachable from `Fetching` and `Writing`, and `Cancelled` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    AdmissionWait,
    Fetching,
    LockWait,
    Writing,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AdmissionWait => "admission_wait",
            Self::Fetching => "fetching",
            Self::LockWait => "lock_wait",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job produced no result.
#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("write failed: {0}")]
    Sink(#[from] SinkError),

    #[error("lock discipline violated: {0}")]
    Concurrency(#[from] ConcurrencyError),

    #[error("cancelled")]
    Cancelled,
}

impl JobFailure {
    /// Short machine-friendly kind, used in summaries and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Sink(_) => "sink",
            Self::Concurrency(_) => "concurrency",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Terminal result of running one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    pub target: String,
    pub result: Result<FetchResult, JobFailure>,
}

impl JobOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> JobState {
        match &self.result {
            Ok(_) => JobState::Done,
            Err(JobFailure::Cancelled) => JobState::Cancelled,
            Err(_) => JobState::Failed,
        }
    }
}

/// Serialize a `Duration` as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_result_serializes_elapsed_seconds() {
        let result = FetchResult {
            job_id: "2006".to_string(),
            target: "http://httpbin.org/delay/2.006".to_string(),
            elapsed: Duration::from_millis(2500),
            payload_summary: "Root=1-abc".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["elapsed_seconds"], 2.5);
        assert_eq!(json["job_id"], "2006");

        let parsed: FetchResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.elapsed, Duration::from_millis(2500));
    }

    #[test]
    fn test_negative_elapsed_rejected() {
        let json = r#"{"job_id":"a","target":"t","elapsed_seconds":-1.0,"payload_summary":""}"#;
        assert!(serde_json::from_str::<FetchResult>(json).is_err());
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Writing.is_terminal());
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert_eq!(JobState::AdmissionWait.to_string(), "admission_wait");
    }

    #[test]
    fn test_outcome_state() {
        let failed = JobOutcome {
            job_id: "1".to_string(),
            target: "t".to_string(),
            result: Err(JobFailure::Fetch(FetchError::Timeout)),
        };
        assert_eq!(failed.state(), JobState::Failed);
        assert_eq!(failed.result.as_ref().unwrap_err().kind(), "fetch");

        let cancelled = JobOutcome {
            job_id: "1".to_string(),
            target: "t".to_string(),
            result: Err(JobFailure::Cancelled),
        };
        assert_eq!(cancelled.state(), JobState::Cancelled);
    }

    #[test]
    fn test_failure_display() {
        let failure = JobFailure::Fetch(FetchError::Timeout);
        assert_eq!(failure.to_string(), "fetch failed: Request timed out");
    }
}
