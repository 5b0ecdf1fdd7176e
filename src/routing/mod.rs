//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     PoolsConfig (active_pool, blue/green addresses)
//!     → table.rs resolves primary and backup
//!     → Freeze as immutable RoutingTable
//!
//! Per request:
//!     RoutingTable + health at `now`
//!     → AttemptPlan (primary first, suspended targets skipped)
//! ```
//!
//! # Design Decisions
//! - Exactly two targets, fixed order for the process lifetime
//! - No dynamic re-election of the primary

pub mod table;
pub mod target;

pub use table::{AttemptPlan, RoutingTable};
pub use target::{PoolId, Role, UpstreamTarget};
