//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive (passive.rs), always on:
//!     Request attempt completes
//!     → outcome classified by the retry engine
//!     → state.rs counts failures / clears on success
//!
//! Active (active.rs), optional:
//!     Periodic timer
//!     → Probe each target
//!     → Same state.rs tracker
//!
//! State machine (state.rs):
//!     Up ←→ Suspended
//!     Threshold within a window, time-bounded suspension
//! ```
//!
//! # Design Decisions
//! - Health state is per target; transitions never span targets
//! - Suspension expires on its own; the next request is the probe

pub mod active;
pub mod passive;
pub mod state;

pub use state::{HealthPolicy, HealthState, HealthTracker, Outcome, Transition};
