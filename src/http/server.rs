//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener with graceful shutdown
//! - Spawn the optional active health monitor

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::schema::ProxyConfig;
use crate::health::active::HealthMonitor;
use crate::http::forward::Forwarder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{bootstrap, Bootstrap, StartupError};
use crate::routing::RoutingTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the failover proxy.
pub struct HttpServer {
    router: Router,
    boot: Bootstrap,
    forwarder: Arc<Forwarder>,
}

impl HttpServer {
    /// Validate the configuration and build the server. Fails before any
    /// socket is touched when the configuration is unusable.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let boot = bootstrap(config)?;
        let forwarder = Arc::new(Forwarder::new(&boot));
        let router = Self::build_router(AppState {
            forwarder: forwarder.clone(),
        });

        Ok(Self {
            router,
            boot,
            forwarder,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            primary = %self.table().primary().pool(),
            backup = %self.table().backup().pool(),
            "HTTP server starting"
        );

        let probe = &self.boot.config.health.probe;
        if probe.enabled {
            let monitor = HealthMonitor::new(self.boot.table.clone(), probe.clone());
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn table(&self) -> &RoutingTable {
        self.forwarder.table()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.boot.config
    }
}

/// Catch-all handler: every request goes through the failover engine.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    state.forwarder.forward(request, client).await
}
