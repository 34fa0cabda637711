//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with the remaining jobs once one of them fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record the failure and let siblings finish.
    #[default]
    Continue,
    /// Cancel every sibling on the first failure.
    Abort,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a fan-out run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of jobs admitted at once. Must be at least 1.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Keep the admission slot while waiting for and holding the result lock.
    /// By default the slot is returned as soon as the fetch completes.
    #[serde(default)]
    pub hold_gate_during_write: bool,
}

fn default_concurrency_limit() -> usize {
    3
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            on_error: ErrorPolicy::default(),
            hold_gate_during_write: false,
        }
    }
}
