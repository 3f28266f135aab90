use crate::config::types::{BatchConfig, Config, EngineConfig, PathsConfig};
use crate::fetch::HttpVersion;
use crate::ConfigError;

/// Largest worker pool the engine accepts
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_batch_config(&config.batch)?;
    validate_paths_config(&config.paths)?;
    Ok(())
}

/// Validates fetch engine configuration
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if HttpVersion::parse(&config.http_version).is_none() {
        return Err(ConfigError::Validation(format!(
            "http-version must be \"1.0\" or \"1.1\", got '{}'",
            config.http_version
        )));
    }

    validate_user_agent(&config.user_agent)?;

    if config.stage_timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "stage-timeout-ms must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// The user agent ends up verbatim in a request header
fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user-agent must not contain control characters, got {:?}",
            user_agent
        )));
    }

    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.first_run_cap < 1 {
        return Err(ConfigError::Validation(
            "first-run-cap must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    if config.report_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "report-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_workers() {
        let mut engine = EngineConfig::default();
        engine.workers = 0;
        assert!(validate_engine_config(&engine).is_err());

        engine.workers = MAX_WORKERS + 1;
        assert!(validate_engine_config(&engine).is_err());

        engine.workers = 1;
        assert!(validate_engine_config(&engine).is_ok());
    }

    #[test]
    fn test_validate_http_version() {
        let mut engine = EngineConfig::default();
        engine.http_version = "2".to_string();
        assert!(validate_engine_config(&engine).is_err());

        engine.http_version = "1.0".to_string();
        assert!(validate_engine_config(&engine).is_ok());
    }

    #[test]
    fn test_validate_user_agent() {
        assert!(validate_user_agent("watchlist/0.1").is_ok());

        assert!(validate_user_agent("").is_err());
        assert!(validate_user_agent("   ").is_err());
        assert!(validate_user_agent("bot\r\nX-Injected: 1").is_err());
    }

    #[test]
    fn test_validate_stage_timeout() {
        let mut engine = EngineConfig::default();
        engine.stage_timeout_ms = Some(0);
        assert!(validate_engine_config(&engine).is_err());
    }

    #[test]
    fn test_validate_first_run_cap() {
        let batch = BatchConfig {
            first_run_cap: 0,
            ..BatchConfig::default()
        };
        assert!(validate_batch_config(&batch).is_err());
    }

    #[test]
    fn test_validate_paths() {
        let paths = PathsConfig {
            data_dir: PathBuf::new(),
            report_dir: PathBuf::from("./reports"),
        };
        assert!(validate_paths_config(&paths).is_err());
    }
}
