//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit one access record per client request
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - JSON format for log shipping, pretty format for terminals
//! - Access records use target `access` and carry `pool` and
//!   `upstream_status` fields for downstream alerting

use std::time::Duration;
use axum::http::{Method, StatusCode};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};
use crate::routing::PoolId;

/// Install the global subscriber. Call once, from a binary.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "failover_proxy={level},access={level},tower_http=warn",
            level = config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Summary of one proxied request.
#[derive(Debug)]
pub struct AccessRecord<'a> {
    pub request_id: &'a str,
    pub method: &'a Method,
    pub path: &'a str,
    pub status: StatusCode,
    /// Pool that served the final response, if any.
    pub pool: Option<PoolId>,
    /// Attempt statuses in order, e.g. "500, 200".
    pub upstream_status: String,
    /// Attempt addresses in order.
    pub upstream_addr: String,
    pub elapsed: Duration,
}

impl AccessRecord<'_> {
    pub fn emit(&self) {
        tracing::info!(
            target: "access",
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            status = self.status.as_u16(),
            pool = self.pool.map_or("-", PoolId::as_str),
            upstream_status = %self.upstream_status,
            upstream_addr = %self.upstream_addr,
            request_time_ms = self.elapsed.as_millis() as u64,
        );
    }
}
