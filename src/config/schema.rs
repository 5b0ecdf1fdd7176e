//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the failover proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (public endpoint).
    pub listener: ListenerConfig,

    /// The two backend pools and which one is primary.
    pub pools: PoolsConfig,

    /// Per-attempt timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry and failover policy.
    pub retries: RetryConfig,

    /// Passive health tracking (and the optional prober).
    pub health: HealthConfig,

    /// Response header handling.
    pub headers: HeaderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request or upstream response body the proxy will buffer.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Backend pool configuration.
///
/// `active_pool` names the primary; the other pool is the backup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolsConfig {
    /// Designated primary: "blue" or "green".
    pub active_pool: String,

    /// Address of the blue pool (host:port).
    pub blue_address: String,

    /// Address of the green pool (host:port).
    pub green_address: String,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            active_pool: "blue".to_string(),
            blue_address: "127.0.0.1:8081".to_string(),
            green_address: "127.0.0.1:8082".to_string(),
        }
    }
}

/// Timeout configuration for backend attempts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Bound on connect + send + receive for a single attempt, in milliseconds.
    pub attempt_ms: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn attempt(&self) -> Duration {
        Duration::from_millis(self.attempt_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 1000,
            attempt_ms: 2000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per client request (primary + backup).
    pub max_attempts: u32,

    /// Hard cap on total time spent across attempts, in milliseconds.
    pub budget_ms: u64,

    /// Backend status codes that trigger failover.
    pub retriable_statuses: Vec<u16>,

    /// Fail over non-idempotent requests even after they reached a backend.
    pub retry_non_idempotent: bool,
}

impl RetryConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            budget_ms: 5000,
            retriable_statuses: vec![500, 502, 503, 504],
            retry_non_idempotent: false,
        }
    }
}

/// Health tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures that suspend a target.
    pub failure_threshold: u32,

    /// Window in which the threshold must be reached, in milliseconds.
    pub failure_window_ms: u64,

    /// How long a suspended target is skipped, in milliseconds.
    pub suspension_ms: u64,

    /// Optional background prober.
    pub probe: ProbeConfig,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            failure_window_ms: 5000,
            suspension_ms: 5000,
            probe: ProbeConfig::default(),
        }
    }
}

/// Active probe configuration. Disabled by default: health is inferred
/// from live traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 2000,
            timeout_ms: 1000,
            path: "/healthz".to_string(),
        }
    }
}

/// Response header handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Response headers that are never stripped on the way to the client.
    pub preserve: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            preserve: vec!["x-app-pool".to_string(), "x-release-id".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Pretty for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
