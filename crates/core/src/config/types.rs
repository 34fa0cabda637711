use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::{ErrorPolicy, OrchestratorConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Run configuration: how many jobs, how many at once, and what to do on failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of jobs to generate.
    #[serde(default = "default_job_count")]
    pub job_count: usize,
    /// Admission gate capacity (must be at least 1).
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Failure policy for sibling jobs.
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Keep the admission token while writing the result.
    #[serde(default)]
    pub hold_gate_during_write: bool,
    /// Exit non-zero when any job failed.
    #[serde(default)]
    pub strict: bool,
    /// Whole-run timeout in seconds (unset = no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            job_count: default_job_count(),
            concurrency_limit: default_concurrency_limit(),
            on_error: ErrorPolicy::default(),
            hold_gate_during_write: false,
            strict: false,
            timeout_secs: None,
        }
    }
}

impl RunConfig {
    /// The orchestrator settings carried by this run configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrency_limit: self.concurrency_limit,
            on_error: self.on_error,
            hold_gate_during_write: self.hold_gate_during_write,
        }
    }
}

fn default_job_count() -> usize {
    10
}

fn default_concurrency_limit() -> usize {
    3
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Base URL of a delay endpoint (`{base_url}/delay/{seconds}`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Lower bound of the generated per-job delay.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Upper bound of the generated per-job delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_base_url() -> String {
    "http://httpbin.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_min_delay() -> u64 {
    1800
}

fn default_max_delay() -> u64 {
    2200
}

/// Result file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    /// Write a `{"run_timestamp": ...}` line when the file is reinitialized.
    #[serde(default = "default_true")]
    pub write_run_header: bool,
    /// fsync after every appended record.
    #[serde(default)]
    pub sync_on_append: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
            write_run_header: true,
            sync_on_append: false,
        }
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_true() -> bool {
    true
}
