//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): client requests by method, status, serving pool
//! - `proxy_request_duration_seconds` (histogram): client-visible latency
//! - `proxy_upstream_attempts_total` (counter): attempts by pool and outcome
//! - `proxy_failovers_total` (counter): requests moved from one pool to the other
//! - `proxy_target_eligible` (gauge): 1=eligible, 0=suspended
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::PoolId;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, pool: Option<PoolId>, start: Instant) {
    let pool = pool.map_or("none", PoolId::as_str);
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "pool" => pool
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "pool" => pool).record(start.elapsed().as_secs_f64());
}

pub fn record_attempt(pool: PoolId, outcome: &'static str) {
    counter!("proxy_upstream_attempts_total", "pool" => pool.as_str(), "outcome" => outcome).increment(1);
}

pub fn record_failover(from: PoolId, to: PoolId) {
    counter!("proxy_failovers_total", "from" => from.as_str(), "to" => to.as_str()).increment(1);
}

pub fn record_target_eligible(pool: PoolId, eligible: bool) {
    gauge!("proxy_target_eligible", "pool" => pool.as_str()).set(if eligible { 1.0 } else { 0.0 });
}
