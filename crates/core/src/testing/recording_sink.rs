//! Recording sink for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::job::FetchResult;
use crate::sink::{RunHeader, Sink, SinkError};

/// Interval during which one `append` call was running.
#[derive(Debug, Clone)]
pub struct WriteSpan {
    pub target: String,
    pub entered: Instant,
    pub exited: Instant,
}

#[derive(Debug, Default)]
struct State {
    results: Vec<FetchResult>,
    spans: Vec<WriteSpan>,
    write_delay: Option<Duration>,
    fail_targets: HashSet<String>,
    fail_begin: bool,
    runs_started: usize,
}

/// In-memory sink that records every write and its timing.
///
/// Clones share state, so a test can keep one handle while the orchestrator
/// owns another. `begin_run` clears the recorded results like a truncated file.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<State>>,
    active: Arc<AtomicUsize>,
    overlap: Arc<AtomicBool>,
}

/// Marks an `append` as finished even if its future is dropped.
struct Active(Arc<AtomicUsize>);

impl Drop for Active {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every append sleeps for `delay` before recording.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.state().write_delay = Some(delay);
        self
    }

    /// Appends for `target` fail with `SinkError::Unavailable`.
    pub fn fail_target(&self, target: &str) {
        self.state().fail_targets.insert(target.to_string());
    }

    /// The next and every later `begin_run` fails.
    pub fn fail_begin_run(&self) {
        self.state().fail_begin = true;
    }

    /// Results recorded since the last `begin_run`, in write order.
    pub fn results(&self) -> Vec<FetchResult> {
        self.state().results.clone()
    }

    pub fn write_spans(&self) -> Vec<WriteSpan> {
        self.state().spans.clone()
    }

    /// Whether two appends were ever running at the same time.
    pub fn overlap_detected(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }

    pub fn runs_started(&self) -> usize {
        self.state().runs_started
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn begin_run(&mut self, _header: &RunHeader) -> Result<(), SinkError> {
        let mut state = self.state();
        if state.fail_begin {
            return Err(SinkError::Unavailable("begin_run disabled".to_string()));
        }
        state.results.clear();
        state.spans.clear();
        state.runs_started += 1;
        Ok(())
    }

    async fn append(&mut self, result: &FetchResult) -> Result<(), SinkError> {
        let entered = Instant::now();
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlap.store(true, Ordering::SeqCst);
        }
        let _active = Active(Arc::clone(&self.active));

        let (delay, fail) = {
            let state = self.state();
            (
                state.write_delay,
                state.fail_targets.contains(&result.target),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(SinkError::Unavailable(format!(
                "refusing to write {}",
                result.target
            )));
        }

        let mut state = self.state();
        state.results.push(result.clone());
        state.spans.push(WriteSpan {
            target: result.target.clone(),
            entered,
            exited: Instant::now(),
        });
        Ok(())
    }
}
