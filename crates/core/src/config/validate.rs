use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one job and a concurrency limit of at least 1
/// - Delay range is ordered
/// - Timeouts are non-zero
/// - Base URL and results path are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.run.job_count == 0 {
        return Err(ConfigError::ValidationError(
            "run.job_count cannot be 0".to_string(),
        ));
    }

    if config.run.concurrency_limit == 0 {
        return Err(ConfigError::ValidationError(
            "run.concurrency_limit must be at least 1".to_string(),
        ));
    }

    if config.run.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "run.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.fetcher.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "fetcher.base_url cannot be empty".to_string(),
        ));
    }

    if config.fetcher.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "fetcher.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.fetcher.min_delay_ms > config.fetcher.max_delay_ms {
        return Err(ConfigError::ValidationError(format!(
            "fetcher.min_delay_ms ({}) exceeds fetcher.max_delay_ms ({})",
            config.fetcher.min_delay_ms, config.fetcher.max_delay_ms
        )));
    }

    if config.sink.results_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "sink.results_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
