//! Shared utilities for integration tests: programmable mock pools and a
//! proxy launcher, all on ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Router,
};
use failover_proxy::config::ProxyConfig;
use failover_proxy::http::HttpServer;
use failover_proxy::lifecycle::Shutdown;
use tokio::net::TcpListener;

/// How a mock pool answers application requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    Status(u16),
    /// Never answer within any test timeout.
    Hang,
}

struct PoolState {
    pool: &'static str,
    release: String,
    mode: Mutex<Mode>,
    hits: AtomicUsize,
    chaos_calls: AtomicUsize,
    /// `/chaos/start` applies the mode, then answers 500.
    reject_chaos_start: AtomicBool,
}

impl PoolState {
    fn mode(&self) -> Mode {
        *self.mode.lock().unwrap()
    }

    fn identity(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-app-pool", HeaderValue::from_static(self.pool));
        headers.insert("x-release-id", HeaderValue::from_str(&self.release).unwrap());
        headers
    }
}

/// An axum app standing in for one pool. Exposes `/version`, `/missing`
/// (always 404), `/large` (a 200 of [`LARGE_BODY_BYTES`]), a catch-all, and
/// the `/chaos/*` control endpoints.
#[derive(Clone)]
pub struct MockPool {
    pub addr: SocketAddr,
    state: Arc<PoolState>,
}

impl MockPool {
    pub async fn start(pool: &'static str) -> Self {
        let state = Arc::new(PoolState {
            pool,
            release: format!("{pool}-v1.0.0"),
            mode: Mutex::new(Mode::Healthy),
            hits: AtomicUsize::new(0),
            chaos_calls: AtomicUsize::new(0),
            reject_chaos_start: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/chaos/start", post(chaos_start))
            .route("/chaos/stop", post(chaos_stop))
            .route("/missing", any(missing))
            .route("/large", any(large))
            .fallback(serve)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn name(&self) -> &'static str {
        self.state.pool
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.state.mode.lock().unwrap() = mode;
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Application requests received (control endpoints excluded).
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn reset_hits(&self) {
        self.state.hits.store(0, Ordering::SeqCst);
    }

    pub fn chaos_calls(&self) -> usize {
        self.state.chaos_calls.load(Ordering::SeqCst)
    }

    pub fn reject_chaos_start(&self, reject: bool) {
        self.state.reject_chaos_start.store(reject, Ordering::SeqCst);
    }
}

async fn serve(State(state): State<Arc<PoolState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match state.mode() {
        Mode::Healthy => (StatusCode::OK, state.identity(), "OK").into_response(),
        Mode::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            (status, state.identity(), "chaos").into_response()
        }
        Mode::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK.into_response()
        }
    }
}

async fn missing(State(state): State<Arc<PoolState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, state.identity(), "not found").into_response()
}

pub const LARGE_BODY_BYTES: usize = 3 * 1024 * 1024;

async fn large(State(state): State<Arc<PoolState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, state.identity(), vec![b'x'; LARGE_BODY_BYTES]).into_response()
}

async fn chaos_start(
    State(state): State<Arc<PoolState>>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    state.chaos_calls.fetch_add(1, Ordering::SeqCst);
    let mode = match params.get("mode").map(String::as_str) {
        Some("timeout") => Mode::Hang,
        _ => Mode::Status(500),
    };
    *state.mode.lock().unwrap() = mode;
    if state.reject_chaos_start.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

async fn chaos_stop(State(state): State<Arc<PoolState>>) -> StatusCode {
    state.chaos_calls.fetch_add(1, Ordering::SeqCst);
    *state.mode.lock().unwrap() = Mode::Healthy;
    StatusCode::OK
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Proxy config with `primary` as the active pool and short timeouts.
pub fn proxy_config(primary: &MockPool, backup: &MockPool) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.pools.active_pool = primary.name().to_string();
    for pool in [primary, backup] {
        match pool.name() {
            "blue" => config.pools.blue_address = pool.addr.to_string(),
            _ => config.pools.green_address = pool.addr.to_string(),
        }
    }
    config.timeouts.connect_ms = 200;
    config.timeouts.attempt_ms = 500;
    config.retries.budget_ms = 2_000;
    config
}

pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let server = HttpServer::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, receiver).await;
        });

        Self { addr, shutdown }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub fn pool_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("x-app-pool")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
