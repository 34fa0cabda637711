//! Per-job protocol: admission, fetch, serialized write.

mod job_runner;

pub use job_runner::{JobContext, JobRunner, StateObserver};
