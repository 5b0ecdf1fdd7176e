//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (every attempt carries a deadline)
//!     → retries.rs (classify outcome, decide failover, enforce budget)
//!     → health tracker records the outcome (see health/)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - The per-request time budget bounds client-visible latency
//! - The health tracker plays the circuit-breaker role per target

pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::{with_deadline, AttemptError};
