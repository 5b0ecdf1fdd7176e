//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve the pool indicator and upstream addresses
//! - Validate value ranges (timeouts > 0, status codes, header names)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::target::{parse_authority, PoolId};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown pool '{0}': expected 'blue' or 'green'")]
    UnknownPool(String),

    #[error("{field}: invalid upstream address '{value}': {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("blue and green pools share the address '{0}'")]
    DuplicateAddress(String),

    #[error("{field}: invalid socket address '{value}'")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.retriable_statuses: {0} is not a valid HTTP status code")]
    InvalidStatus(u16),

    #[error("headers.preserve: '{0}' is not a valid header name")]
    InvalidHeaderName(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pools.active_pool.parse::<PoolId>().is_err() {
        errors.push(ValidationError::UnknownPool(config.pools.active_pool.clone()));
    }

    let blue = check_address(&mut errors, "pools.blue_address", &config.pools.blue_address);
    let green = check_address(&mut errors, "pools.green_address", &config.pools.green_address);
    if let (Some(blue), Some(green)) = (blue, green) {
        if blue.eq_ignore_ascii_case(&green) {
            errors.push(ValidationError::DuplicateAddress(blue));
        }
    }

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let positive = [
        ("listener.max_body_bytes", config.listener.max_body_bytes as u64),
        ("timeouts.connect_ms", config.timeouts.connect_ms),
        ("timeouts.attempt_ms", config.timeouts.attempt_ms),
        ("retries.max_attempts", u64::from(config.retries.max_attempts)),
        ("retries.budget_ms", config.retries.budget_ms),
        ("health.failure_threshold", u64::from(config.health.failure_threshold)),
        ("health.failure_window_ms", config.health.failure_window_ms),
        ("health.suspension_ms", config.health.suspension_ms),
    ];
    errors.extend(
        positive
            .iter()
            .filter(|(_, value)| *value == 0)
            .map(|(field, _)| ValidationError::Zero(*field)),
    );

    if config.health.probe.enabled {
        if config.health.probe.interval_ms == 0 {
            errors.push(ValidationError::Zero("health.probe.interval_ms"));
        }
        if config.health.probe.timeout_ms == 0 {
            errors.push(ValidationError::Zero("health.probe.timeout_ms"));
        }
    }

    errors.extend(
        config
            .retries
            .retriable_statuses
            .iter()
            .filter(|code| !(100..=599).contains(*code))
            .map(|code| ValidationError::InvalidStatus(*code)),
    );

    errors.extend(
        config
            .headers
            .preserve
            .iter()
            .filter(|name| HeaderName::from_bytes(name.as_bytes()).is_err())
            .map(|name| ValidationError::InvalidHeaderName(name.clone())),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) -> Option<String> {
    match parse_authority(value) {
        Ok(authority) => Some(authority.to_string()),
        Err(reason) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
                reason,
            });
            None
        }
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.pools.active_pool = "yellow".into();
        config.pools.blue_address = "".into();
        config.pools.green_address = "green-no-port".into();
        config.retries.max_attempts = 0;
        config.retries.retriable_statuses = vec![503, 700];
        config.headers.preserve = vec!["x-app-pool".into(), "bad header".into()];
        config.listener.bind_address = "not-an-addr".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnknownPool("yellow".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress { field: "pools.blue_address", .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidAddress { field: "pools.green_address", .. })));
        assert!(errors.contains(&ValidationError::Zero("retries.max_attempts")));
        assert!(errors.contains(&ValidationError::InvalidStatus(700)));
        assert!(errors.contains(&ValidationError::InvalidHeaderName("bad header".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidSocketAddr { field: "listener.bind_address", .. })));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn rejects_shared_upstream() {
        let mut config = ProxyConfig::default();
        config.pools.green_address = config.pools.blue_address.clone();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::DuplicateAddress("127.0.0.1:8081".into())])
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
