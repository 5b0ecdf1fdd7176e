//! Active health checking.
//!
//! Optional: off by default, since health is normally inferred from traffic.
//! When enabled, periodically probes every target and feeds the result into
//! the same tracker the request path uses.

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::schema::ProbeConfig;
use crate::health::passive;
use crate::health::state::Outcome;
use crate::routing::{RoutingTable, UpstreamTarget};

pub struct HealthMonitor {
    table: Arc<RoutingTable>,
    config: ProbeConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(table: Arc<RoutingTable>, config: ProbeConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.timeout_ms)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            table,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health probes disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_all(&self) {
        for target in self.table.targets() {
            let outcome = if self.probe(target).await {
                Outcome::Success
            } else {
                Outcome::Failure
            };
            passive::observe(target, outcome);
        }
    }

    async fn probe(&self, target: &UpstreamTarget) -> bool {
        let uri = match self.config.path.parse::<Uri>().map(|path| target.upstream_uri(&path)) {
            Ok(Ok(uri)) => uri,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to build health probe URI");
                return false;
            }
            Err(e) => {
                tracing::error!(path = %self.config.path, error = %e, "Invalid health probe path");
                return false;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "failover-proxy-health-probe")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health probe request");
                return false;
            }
        };

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::debug!(pool = %target.pool(), status = %response.status(), "Health probe failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::debug!(pool = %target.pool(), error = %e, "Health probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(pool = %target.pool(), "Health probe failed: timeout");
                false
            }
        }
    }
}
