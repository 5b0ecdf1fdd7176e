//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document. Missing sections fall back to defaults.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read a TOML file without validating it, so overrides can still be applied.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = parse_config(
            r#"
            [pools]
            active_pool = "green"
            blue_address = "app_blue:3000"
            green_address = "app_green:3000"

            [health]
            suspension_ms = 10000

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.pools.active_pool, "green");
        assert_eq!(config.pools.blue_address, "app_blue:3000");
        assert_eq!(config.health.suspension_ms, 10000);
        assert_eq!(config.health.failure_threshold, 2);
        assert_eq!(config.retries.max_attempts, 2);
        assert_eq!(config.retries.retriable_statuses, vec![500, 502, 503, 504]);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.headers.preserve, vec!["x-app-pool", "x-release-id"]);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse_config("[pools\nactive_pool = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn validation_errors_are_listed() {
        let err = ConfigError::Validation(vec![
            ValidationError::UnknownPool("red".into()),
            ValidationError::Zero("retries.budget_ms"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: unknown pool 'red': expected 'blue' or 'green', retries.budget_ms must be greater than zero"
        );
    }
}
