//! Passive health checking (failure detection from live traffic).
//!
//! # Responsibilities
//! - Feed request outcomes into the target's tracker
//! - Log and export state transitions
//!
//! # Design Decisions
//! - Connection errors, timeouts and retriable 5xx count as failures
//! - 4xx and non-retriable statuses count as successes (the backend answered)
//! - The caller classifies; this module only records

use std::time::Instant;

use crate::health::state::{Outcome, Transition};
use crate::observability::metrics;
use crate::routing::UpstreamTarget;

/// Record an outcome for `target` at the current instant.
pub fn observe(target: &UpstreamTarget, outcome: Outcome) -> Option<Transition> {
    observe_at(target, outcome, Instant::now())
}

pub fn observe_at(target: &UpstreamTarget, outcome: Outcome, now: Instant) -> Option<Transition> {
    let transition = target.health().record_outcome(outcome, now);

    match transition {
        Some(Transition::Suspended { until }) => {
            tracing::warn!(
                pool = %target.pool(),
                role = %target.role(),
                address = %target.authority(),
                suspended_for_ms = until.saturating_duration_since(now).as_millis() as u64,
                "Target suspended after consecutive failures"
            );
            metrics::record_target_eligible(target.pool(), false);
        }
        Some(Transition::Recovered) => {
            tracing::info!(
                pool = %target.pool(),
                role = %target.role(),
                address = %target.authority(),
                "Target recovered"
            );
            metrics::record_target_eligible(target.pool(), true);
        }
        None => {}
    }

    transition
}
