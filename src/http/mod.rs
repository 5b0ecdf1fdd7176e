//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → forward.rs (attempt order, per-attempt deadline, failover)
//!         → request.rs (upstream request per attempt)
//!         → headers.rs (hop-by-hop stripping, X-Forwarded-*)
//!     → response.rs (verbatim pass-through or synthesized 502/504)
//!     → Send to client
//! ```

pub mod forward;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forwarder, RequestAttempt};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
