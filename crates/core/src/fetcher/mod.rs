//! Remote fetch abstraction.
//!
//! A [`Fetcher`] performs exactly one call per job and never retries; the
//! caller cancels a fetch by dropping its future.

mod error;
mod http;

pub use error::FetchError;
pub use http::{summarize_payload, HttpFetcher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a successful fetch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// Status code reported by the remote side.
    pub status: u16,
    /// Short description of the payload (trace id, excerpt, ...).
    pub summary: String,
    /// Size of the payload in bytes.
    pub body_bytes: usize,
}

/// Performs one remote call per job.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Fetch `target` once.
    async fn fetch(&self, target: &str) -> Result<FetchOutcome, FetchError>;
}
