use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `FANOUT_RUN__CONCURRENCY_LIMIT=5`.
pub const ENV_PREFIX: &str = "FANOUT_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    layered(Some(path), ENV_PREFIX)
}

/// Load defaults, then the TOML file if it exists, then environment overrides.
///
/// Unlike [`load_config`], a missing file is not an error: the run can be
/// configured entirely from the environment.
pub fn load_layered_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    layered(path.filter(|p| p.exists()), ENV_PREFIX)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn layered(path: Option<&Path>, env_prefix: &str) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ErrorPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[run]
concurrency_limit = 4
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.run.concurrency_limit, 4);
        assert_eq!(config.run.job_count, 10);
    }

    #[test]
    fn test_load_config_from_str_invalid_type() {
        let toml = r#"
[run]
concurrency_limit = "many"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/fanout.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[run]
job_count = 4
on_error = "abort"

[sink]
results_path = "out/results.json"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.run.job_count, 4);
        assert_eq!(config.run.on_error, ErrorPolicy::Abort);
        assert_eq!(config.sink.results_path.to_str().unwrap(), "out/results.json");
    }

    #[test]
    fn test_layered_missing_file_uses_defaults() {
        let config = layered(None, "FANOUT_TEST_DEFAULTS_").unwrap();
        assert_eq!(config.run.concurrency_limit, 3);
        assert_eq!(config.fetcher.timeout_secs, 30);
    }

    #[test]
    fn test_layered_env_overrides_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[run]
job_count = 4
concurrency_limit = 2
"#
        )
        .unwrap();

        std::env::set_var("FANOUT_TEST_LAYER_RUN__CONCURRENCY_LIMIT", "6");
        std::env::set_var("FANOUT_TEST_LAYER_FETCHER__BASE_URL", "http://127.0.0.1:9");
        let config = layered(Some(temp_file.path()), "FANOUT_TEST_LAYER_").unwrap();
        std::env::remove_var("FANOUT_TEST_LAYER_RUN__CONCURRENCY_LIMIT");
        std::env::remove_var("FANOUT_TEST_LAYER_FETCHER__BASE_URL");

        assert_eq!(config.run.job_count, 4);
        assert_eq!(config.run.concurrency_limit, 6);
        assert_eq!(config.fetcher.base_url, "http://127.0.0.1:9");
    }
}
