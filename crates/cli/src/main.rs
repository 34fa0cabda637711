mod metrics;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanout_core::{
    load_layered_config, validate_config, Config, ErrorPolicy, HttpFetcher, JobPlan,
    JsonLinesSink, Orchestrator,
};

/// Exit code when strict mode is on and at least one job failed.
const EXIT_JOB_FAILURES: i32 = 2;

/// Fetch delay endpoints concurrently and record the results.
#[derive(Parser, Debug)]
#[command(name = "fanout", version)]
#[command(about = "Bounded-concurrency fetch fan-out with a serialized results file")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "FANOUT_CONFIG", default_value = "fanout.toml")]
    config: PathBuf,

    /// Number of jobs to generate (overrides config)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Maximum number of concurrent fetches (overrides config)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Base URL of the delay endpoint (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Results file (overrides config)
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// What to do with the remaining jobs when one fails
    #[arg(long, value_enum)]
    on_error: Option<OnError>,

    /// Keep the admission slot while writing the result
    #[arg(long, default_value_t = false)]
    hold_gate: bool,

    /// Exit non-zero if any job failed
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Cancel the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "FANOUT_LOG_JSON", default_value_t = false)]
    log_json: bool,

    /// Print Prometheus metrics after the run
    #[arg(long, default_value_t = false)]
    print_metrics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OnError {
    Continue,
    Abort,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Continue => ErrorPolicy::Continue,
            OnError::Abort => ErrorPolicy::Abort,
        }
    }
}

impl Cli {
    /// Command-line flags win over file and environment settings.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(jobs) = self.jobs {
            config.run.job_count = jobs;
        }
        if let Some(limit) = self.limit {
            config.run.concurrency_limit = limit;
        }
        if let Some(base_url) = &self.base_url {
            config.fetcher.base_url = base_url.clone();
        }
        if let Some(results) = &self.results {
            config.sink.results_path = results.clone();
        }
        if let Some(on_error) = self.on_error {
            config.run.on_error = on_error.into();
        }
        if self.hold_gate {
            config.run.hold_gate_during_write = true;
        }
        if self.strict {
            config.run.strict = true;
        }
        if let Some(timeout) = self.timeout_secs {
            config.run.timeout_secs = Some(timeout);
        }
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // Load configuration
    info!("Loading configuration from {:?}", cli.config);
    let mut config = load_layered_config(Some(&cli.config))
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    cli.apply_overrides(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        jobs = config.run.job_count,
        concurrency_limit = config.run.concurrency_limit,
        on_error = %config.run.on_error,
        base_url = %config.fetcher.base_url,
        results = %config.sink.results_path.display(),
        "Configuration loaded"
    );

    // Plan the jobs
    let plan = JobPlan::generate(
        config.run.job_count,
        &config.fetcher.base_url,
        config.fetcher.min_delay_ms..=config.fetcher.max_delay_ms,
    );
    info!(
        jobs = plan.len(),
        sequential_ms = plan.total_delay().as_millis() as u64,
        lower_bound_ms = plan.minimum_wall_time(config.run.concurrency_limit).as_millis() as u64,
        "Job plan generated"
    );

    // Wire the run
    let fetcher = HttpFetcher::new(&config.fetcher).context("Failed to create HTTP client")?;
    let sink = JsonLinesSink::from_config(&config.sink);
    let mut orchestrator = Orchestrator::new(config.run.orchestrator_config(), Arc::new(fetcher), sink)
        .context("Failed to create orchestrator")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            warn!("Shutdown signal received, cancelling run");
            cancel.cancel();
        }
    });
    if let Some(secs) = config.run.timeout_secs {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "Run timed out, cancelling");
            cancel.cancel();
        });
    }

    let summary = orchestrator
        .run_until_cancelled(plan.into_jobs(), cancel)
        .await
        .context("Run failed")?;

    for failure in &summary.failures {
        warn!(
            job_id = %failure.job_id,
            target = %failure.target,
            kind = failure.kind,
            "{}",
            failure.error
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );

    if cli.print_metrics {
        print!("{}", metrics::encode_metrics()?);
    }

    if config.run.strict && summary.has_failures() {
        error!(failed = summary.failed, "Jobs failed in strict mode");
        return Ok(EXIT_JOB_FAILURES);
    }
    Ok(0)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // Logs go to stderr; stdout carries the summary.
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
