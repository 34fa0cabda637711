//! Generation of delay-endpoint job lists.

use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

use super::Job;

/// A generated set of jobs against a `{base_url}/delay/{seconds}` endpoint.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub jobs: Vec<Job>,
    /// Requested delay of each job, parallel to `jobs`.
    pub delays: Vec<Duration>,
}

impl JobPlan {
    /// Generate `count` jobs with delays drawn uniformly from `delay_ms`.
    ///
    /// Each job id is its delay in milliseconds, so two jobs can share an id.
    pub fn generate(count: usize, base_url: &str, delay_ms: RangeInclusive<u64>) -> Self {
        Self::generate_with(&mut rand::rng(), count, base_url, delay_ms)
    }

    /// Same as [`generate`](Self::generate) with a caller-provided RNG.
    pub fn generate_with<R: Rng>(
        rng: &mut R,
        count: usize,
        base_url: &str,
        delay_ms: RangeInclusive<u64>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut jobs = Vec::with_capacity(count);
        let mut delays = Vec::with_capacity(count);

        for _ in 0..count {
            let ms = rng.random_range(delay_ms.clone());
            jobs.push(Job::new(
                ms.to_string(),
                format!("{}/delay/{}", base, ms as f64 / 1000.0),
            ));
            delays.push(Duration::from_millis(ms));
        }

        Self { jobs, delays }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Wall time if every job ran one after the other.
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }

    /// Lower bound on wall time with `concurrency_limit` slots.
    ///
    /// Some slot must serve at least `ceil(n / k)` jobs, each taking at least
    /// the shortest delay.
    pub fn minimum_wall_time(&self, concurrency_limit: usize) -> Duration {
        let Some(shortest) = self.delays.iter().min() else {
            return Duration::ZERO;
        };
        let waves = self.jobs.len().div_ceil(concurrency_limit.max(1));
        *shortest * waves as u32
    }

    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }
}
