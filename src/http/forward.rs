//! Failover-aware forwarding (the routing and retry engine).
//!
//! # Per-request algorithm
//! ```text
//! buffer request body
//!     → attempt order from RoutingTable + current health
//!     → for each target (≤ max_attempts, within budget):
//!           send with deadline = min(attempt timeout, budget left)
//!           record outcome in the target's health tracker
//!           qualifying success → return it verbatim
//!           qualifying failure → next target if method allows
//!     → exhausted: last backend response, or synthesized 502/504
//! ```
//!
//! # Design Decisions
//! - Attempts within one request are strictly sequential
//! - Upstream bodies are read inside the deadline so a stalled body is a
//!   failure that can still fail over
//! - Only exhaustion surfaces an error to the client

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::body::{Body, Bytes};
use axum::http::{header::CONTENT_LENGTH, Request, Response, StatusCode};
use axum::response::IntoResponse;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::schema::ProxyConfig;
use crate::health::passive;
use crate::health::state::Outcome;
use crate::http::headers::PreservedHeaders;
use crate::http::request::{build_upstream_request, request_id};
use crate::http::response;
use crate::lifecycle::Bootstrap;
use crate::observability::logging::AccessRecord;
use crate::observability::metrics;
use crate::resilience::timeouts::error_chain;
use crate::resilience::{with_deadline, AttemptError, RetryPolicy};
use crate::routing::{PoolId, RoutingTable};

/// Outcome of one upstream attempt. Lives only for the client request.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub pool: PoolId,
    pub address: String,
    pub result: Result<StatusCode, AttemptError>,
    pub elapsed: Duration,
}

impl RequestAttempt {
    /// Status as an access log would show it; transport errors map to the
    /// gateway status they would surface as.
    pub fn status_label(&self) -> u16 {
        match &self.result {
            Ok(status) => status.as_u16(),
            Err(e) => e.gateway_status().as_u16(),
        }
    }
}

enum LastFailure {
    Response(Response<Bytes>, PoolId),
    Error(AttemptError),
}

pub struct Forwarder {
    table: Arc<RoutingTable>,
    client: Client<HttpConnector, Body>,
    retry: RetryPolicy,
    preserved: PreservedHeaders,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(boot: &Bootstrap) -> Self {
        let config: &ProxyConfig = &boot.config;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeouts.connect()));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(connector);

        Self {
            table: boot.table.clone(),
            client,
            retry: RetryPolicy::from_config(&config.retries, &config.timeouts),
            preserved: PreservedHeaders::from_config(&config.headers),
            max_body_bytes: config.listener.max_body_bytes,
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Produce exactly one client response for `request`.
    pub async fn forward(&self, request: Request<Body>, client: SocketAddr) -> Response<Body> {
        let start = Instant::now();
        let request_id = request_id(request.headers()).to_string();
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let declared_len = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > self.max_body_bytes) {
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
                return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            }
        };

        let plan = self.table.attempt_order(Instant::now());
        if plan.degraded {
            tracing::warn!(request_id = %request_id, "All targets suspended, trying in primary-first order");
        }

        let mut attempts: Vec<RequestAttempt> = Vec::with_capacity(plan.targets.len());
        let mut last_failure: Option<LastFailure> = None;

        for target in plan.targets.iter().take(self.retry.max_attempts()) {
            let Some(deadline) = self.retry.attempt_deadline(start.elapsed()) else {
                tracing::warn!(
                    request_id = %request_id,
                    budget_ms = self.retry.budget().as_millis() as u64,
                    "Retry budget exhausted"
                );
                break;
            };

            if let Some(previous) = attempts.last() {
                tracing::info!(
                    request_id = %request_id,
                    from = %previous.pool,
                    to = %target.pool(),
                    "Failing over"
                );
                metrics::record_failover(previous.pool, target.pool());
            }

            let upstream = match build_upstream_request(&parts, body.clone(), target, client) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream request");
                    let response = response::gateway_failure(StatusCode::BAD_GATEWAY);
                    return self.finish(&request_id, &parts.method, &path, start, &attempts, None, response);
                }
            };

            let attempt_start = Instant::now();
            let result = with_deadline(deadline, self.send(upstream)).await;
            let status = result.as_ref().map(Response::status).map_err(|e| e.clone());
            let outcome = self.retry.classify(&status);

            passive::observe(target, outcome);
            metrics::record_attempt(
                target.pool(),
                match &status {
                    Ok(_) if outcome == Outcome::Success => "success",
                    Ok(_) => "retriable_status",
                    Err(e) => e.kind(),
                },
            );
            attempts.push(RequestAttempt {
                pool: target.pool(),
                address: target.authority().to_string(),
                result: status,
                elapsed: attempt_start.elapsed(),
            });

            match result {
                Ok(upstream) if outcome == Outcome::Success => {
                    let response = response::from_upstream(upstream, &self.preserved);
                    return self.finish(&request_id, &parts.method, &path, start, &attempts, Some(target.pool()), response);
                }
                Ok(upstream) => {
                    tracing::warn!(
                        request_id = %request_id,
                        pool = %target.pool(),
                        status = %upstream.status(),
                        "Upstream returned retriable status"
                    );
                    last_failure = Some(LastFailure::Response(upstream, target.pool()));
                    if !self.retry.may_fail_over(&parts.method, None) {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        request_id = %request_id,
                        pool = %target.pool(),
                        kind = error.kind(),
                        error = %error,
                        "Upstream attempt failed"
                    );
                    let may_fail_over = self.retry.may_fail_over(&parts.method, Some(&error));
                    last_failure = Some(LastFailure::Error(error));
                    if !may_fail_over {
                        break;
                    }
                }
            }
        }

        let (pool, response) = match last_failure {
            Some(LastFailure::Response(upstream, pool)) => {
                (Some(pool), response::from_upstream(upstream, &self.preserved))
            }
            Some(LastFailure::Error(error)) => (None, response::gateway_failure(error.gateway_status())),
            // Budget spent before any attempt could start.
            None => (None, response::gateway_failure(StatusCode::GATEWAY_TIMEOUT)),
        };
        tracing::error!(
            request_id = %request_id,
            attempts = attempts.len(),
            status = %response.status(),
            "All upstream attempts failed"
        );
        self.finish(&request_id, &parts.method, &path, start, &attempts, pool, response)
    }

    /// Send one request and buffer the response body. The request body
    /// limit does not apply here; a healthy backend's answer is never cut.
    async fn send(&self, request: Request<Body>) -> Result<Response<Bytes>, AttemptError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(AttemptError::from_client)?;

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), usize::MAX)
            .await
            .map_err(|e| AttemptError::Body(error_chain(&e)))?;
        Ok(Response::from_parts(parts, bytes))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        request_id: &str,
        method: &axum::http::Method,
        path: &str,
        start: Instant,
        attempts: &[RequestAttempt],
        pool: Option<PoolId>,
        response: Response<Body>,
    ) -> Response<Body> {
        let join = |f: &dyn Fn(&RequestAttempt) -> String| {
            if attempts.is_empty() {
                "-".to_string()
            } else {
                attempts.iter().map(f).collect::<Vec<_>>().join(", ")
            }
        };

        AccessRecord {
            request_id,
            method,
            path,
            status: response.status(),
            pool,
            upstream_status: join(&|a| a.status_label().to_string()),
            upstream_addr: join(&|a| a.address.clone()),
            elapsed: start.elapsed(),
        }
        .emit();
        metrics::record_request(method.as_str(), response.status().as_u16(), pool, start);

        response
    }
}
