pub mod concurrency;
pub mod config;
pub mod fetcher;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod runner;
pub mod sink;
pub mod testing;

pub use concurrency::{AdmissionGate, ConcurrencyError, GateStatus, GateToken, ResultLock};
pub use config::{
    load_config, load_config_from_str, load_layered_config, validate_config, Config, ConfigError,
    FetcherConfig, RunConfig, SinkConfig,
};
pub use fetcher::{FetchError, FetchOutcome, Fetcher, HttpFetcher};
pub use job::{FetchResult, Job, JobFailure, JobOutcome, JobPlan, JobState};
pub use orchestrator::{
    ErrorPolicy, FailedJob, Orchestrator, OrchestratorConfig, OrchestratorError, RunSummary,
    TeardownStatus,
};
pub use runner::{JobContext, JobRunner, StateObserver};
pub use sink::{read_results, JsonLinesSink, ResultsFile, RunHeader, Sink, SinkError, SinkRecord};
