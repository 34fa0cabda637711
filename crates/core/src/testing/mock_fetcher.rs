//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, FetchOutcome, Fetcher};

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Per-target (or default) simulated latency, driven by `tokio::time`
/// - Per-target failures, returned after the latency elapsed
/// - Recorded calls and an in-flight high-water mark
///
/// # Example
///
/// ```rust,ignore
/// use fanout_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::with_default_delay(Duration::from_secs(2));
/// fetcher.set_failure("http://t/3", FetchError::Timeout).await;
///
/// // Run jobs...
/// assert!(fetcher.max_in_flight() <= 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    default_delay: Arc<RwLock<Duration>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    failures: Arc<RwLock<HashMap<String, FetchError>>>,
    calls: Arc<RwLock<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockFetcher {
    /// Create a mock that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock where every fetch takes `delay` unless overridden.
    pub fn with_default_delay(delay: Duration) -> Self {
        Self {
            default_delay: Arc::new(RwLock::new(delay)),
            ..Self::default()
        }
    }

    pub async fn set_default_delay(&self, delay: Duration) {
        *self.default_delay.write().await = delay;
    }

    /// Simulated latency for one target.
    pub async fn set_delay(&self, target: &str, delay: Duration) {
        self.delays.write().await.insert(target.to_string(), delay);
    }

    /// Make every fetch of `target` fail with `error`.
    pub async fn set_failure(&self, target: &str, error: FetchError) {
        self.failures.write().await.insert(target.to_string(), error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Targets fetched so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Fetches currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous fetches observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn delay_for(&self, target: &str) -> Duration {
        match self.delays.read().await.get(target) {
            Some(delay) => *delay,
            None => *self.default_delay.read().await,
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, target: &str) -> Result<FetchOutcome, FetchError> {
        self.calls.write().await.push(target.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(Arc::clone(&self.in_flight));

        let delay = self.delay_for(target).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.read().await.get(target) {
            return Err(error.clone());
        }

        Ok(FetchOutcome {
            status: 200,
            summary: format!("mock:{target}"),
            body_bytes: 0,
        })
    }
}
