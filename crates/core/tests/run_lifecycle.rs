//! Run lifecycle integration tests.
//!
//! These tests drive whole runs through the orchestrator with a mock fetcher
//! and a recording sink, on paused tokio time:
//! admission -> fetch -> serialized write -> summary

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use fanout_core::{
    testing::{fixtures, MockFetcher, RecordingSink},
    ErrorPolicy, FetchError, Job, Orchestrator, OrchestratorConfig,
};

/// Test helper bundling a fetcher and a sink shared with the orchestrator.
struct TestHarness {
    fetcher: MockFetcher,
    sink: RecordingSink,
}

impl TestHarness {
    fn new(fetch_delay: Duration) -> Self {
        Self {
            fetcher: MockFetcher::with_default_delay(fetch_delay),
            sink: RecordingSink::new(),
        }
    }

    fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator<RecordingSink> {
        Orchestrator::new(config, Arc::new(self.fetcher.clone()), self.sink.clone())
            .expect("Failed to create orchestrator")
    }
}

fn config(limit: usize, on_error: ErrorPolicy) -> OrchestratorConfig {
    OrchestratorConfig {
        concurrency_limit: limit,
        on_error,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_ten_jobs_limit_three() {
    let h = TestHarness::new(Duration::from_secs(2));
    let mut orchestrator = h.orchestrator(config(3, ErrorPolicy::Continue));

    let summary = orchestrator.run(fixtures::jobs(10)).await.unwrap();

    // Four waves of at most three two-second fetches.
    assert!(summary.elapsed >= Duration::from_secs(8));
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.fetcher.max_in_flight(), 3);

    let results = h.sink.results();
    assert_eq!(results.len(), 10);
    for result in &results {
        let secs = result.elapsed_seconds();
        assert!((1.8..=2.4).contains(&secs), "elapsed {secs} out of range");
    }
    assert!(!h.sink.overlap_detected());
    assert!(summary.teardown.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_continue_policy_isolates_failure() {
    let h = TestHarness::new(Duration::from_secs(1));
    h.fetcher
        .set_failure(&fixtures::target(2), FetchError::ConnectionFailed("refused".into()))
        .await;
    let mut orchestrator = h.orchestrator(config(5, ErrorPolicy::Continue));

    let summary = orchestrator.run(fixtures::jobs(5)).await.unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cancelled, 0);
    assert_eq!(summary.failures[0].job_id, "job-2");
    assert_eq!(summary.failures[0].kind, "fetch");
    assert_eq!(h.sink.results().len(), 4);
    assert!(summary.teardown.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_abort_policy_cancels_siblings() {
    let h = TestHarness::new(Duration::from_secs(1));
    let failing = fixtures::target(2);
    h.fetcher.set_delay(&failing, Duration::ZERO).await;
    h.fetcher.set_failure(&failing, FetchError::Timeout).await;
    let mut orchestrator = h.orchestrator(config(5, ErrorPolicy::Abort));

    let summary = orchestrator.run(fixtures::jobs(5)).await.unwrap();

    assert!(summary.failed >= 1);
    assert!(summary.succeeded + summary.failed < 5);
    assert_eq!(summary.total(), 5);
    assert!(summary.cancelled >= 1);
    assert!(summary.elapsed < Duration::from_secs(1));
    assert!(h.sink.results().is_empty());
    assert!(summary.teardown.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_abort_on_sink_failure() {
    let h = TestHarness::new(Duration::from_secs(1));
    h.sink.fail_target(&fixtures::target(0));
    let mut orchestrator = h.orchestrator(config(1, ErrorPolicy::Abort));

    let summary = orchestrator.run(fixtures::jobs(4)).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].kind, "sink");
    assert_eq!(summary.succeeded + summary.cancelled, 3);
    assert!(summary.cancelled >= 2);
    assert!(summary.teardown.is_clean());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_ids_both_recorded() {
    let h = TestHarness::new(Duration::from_millis(2006));
    let mut orchestrator = h.orchestrator(config(3, ErrorPolicy::Continue));
    let jobs = vec![
        Job::new("2006", "http://mock.local/delay/2.006"),
        Job::new("2006", "http://mock.local/delay/2.006"),
        Job::new("1999", "http://mock.local/delay/1.999"),
    ];

    let summary = orchestrator.run(jobs).await.unwrap();

    assert_eq!(summary.succeeded, 3);
    let duplicates = h
        .sink
        .results()
        .iter()
        .filter(|r| r.job_id == "2006")
        .count();
    assert_eq!(duplicates, 2);
}

#[tokio::test(start_paused = true)]
async fn test_writes_never_overlap() {
    let h = TestHarness::new(Duration::ZERO);
    let sink = h.sink.clone().with_write_delay(Duration::from_millis(50));
    let mut orchestrator = Orchestrator::new(
        config(8, ErrorPolicy::Continue),
        Arc::new(h.fetcher.clone()),
        sink.clone(),
    )
    .unwrap();

    let summary = orchestrator.run(fixtures::jobs(8)).await.unwrap();
    assert_eq!(summary.succeeded, 8);
    assert!(!sink.overlap_detected());

    let mut spans = sink.write_spans();
    spans.sort_by_key(|s| s.entered);
    for pair in spans.windows(2) {
        assert!(
            pair[0].exited <= pair[1].entered,
            "{} and {} overlap",
            pair[0].target,
            pair[1].target
        );
    }
    // Serialized writes dominate the run.
    assert!(summary.elapsed >= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_run_releases_everything() {
    let h = TestHarness::new(Duration::from_secs(2));
    let mut orchestrator = h.orchestrator(config(3, ErrorPolicy::Continue));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(3)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = orchestrator
        .run_until_cancelled(fixtures::jobs(10), cancel)
        .await
        .unwrap();

    // The first wave finished, the second was interrupted mid-fetch.
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.cancelled, 7);
    assert_eq!(summary.total(), 10);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(summary.teardown.is_clean());
    assert_eq!(h.fetcher.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_while_writes_queue() {
    let h = TestHarness::new(Duration::from_millis(100));
    let sink = h.sink.clone().with_write_delay(Duration::from_secs(1));
    let mut orchestrator = Orchestrator::new(
        OrchestratorConfig {
            concurrency_limit: 4,
            on_error: ErrorPolicy::Continue,
            hold_gate_during_write: true,
        },
        Arc::new(h.fetcher.clone()),
        sink.clone(),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let summary = orchestrator
        .run_until_cancelled(fixtures::jobs(6), cancel)
        .await
        .unwrap();

    // A write in progress completes; queued writers give up.
    assert_eq!(summary.succeeded, sink.results().len());
    assert!(summary.succeeded >= 1);
    assert!(summary.cancelled >= 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.teardown.is_clean());
    assert!(!orchestrator.sink().is_held());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_run_releases_resources() {
    let h = TestHarness::new(Duration::from_secs(2));
    let mut orchestrator = h.orchestrator(config(3, ErrorPolicy::Continue));

    let timed_out =
        tokio::time::timeout(Duration::from_secs(3), orchestrator.run(fixtures::jobs(10))).await;
    assert!(timed_out.is_err());

    // Aborted tasks are dropped by the runtime on their next turn.
    sleep(Duration::from_millis(10)).await;

    assert_eq!(h.fetcher.in_flight(), 0);
    assert!(!orchestrator.sink().is_held());
    assert_eq!(h.sink.results().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token() {
    let h = TestHarness::new(Duration::from_secs(2));
    let mut orchestrator = h.orchestrator(config(3, ErrorPolicy::Continue));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = orchestrator
        .run_until_cancelled(fixtures::jobs(5), cancel)
        .await
        .unwrap();

    assert_eq!(summary.cancelled, 5);
    assert!(h.fetcher.calls().await.is_empty());
    assert!(summary.teardown.is_clean());
}
