//! Target health state machine.
//!
//! # States
//! - Up: target is eligible for first-choice selection
//! - Suspended: target is skipped in attempt ordering until the suspension expires
//!
//! # State Transitions
//! ```text
//! Up → Suspended: consecutive failures >= failure_threshold within failure_window
//! Suspended → Up: suspended_until has elapsed (the next attempt is the probe)
//!                 or a success is observed
//! ```
//!
//! # Design Decisions
//! - The failure window starts at the first failure of a run; if it elapses
//!   before the threshold is reached the count starts over
//! - Any success clears the failure count
//! - Callers pass `now` explicitly so the policy is testable without a clock
//! - One lock per target; no operation spans two targets

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::schema::HealthConfig;

/// Tuning for the health state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub failure_threshold: u32,
    pub failure_window: Duration,
    pub suspension: Duration,
}

impl HealthPolicy {
    pub fn from_config(config: &HealthConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            failure_window: Duration::from_millis(config.failure_window_ms),
            suspension: Duration::from_millis(config.suspension_ms),
        }
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::from_config(&HealthConfig::default())
    }
}

/// Observed result of one request against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Externally visible health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Up,
    Suspended,
}

/// State change caused by recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The target crossed its failure threshold.
    Suspended { until: Instant },
    /// A suspended target served a successful request.
    Recovered,
}

#[derive(Debug, Default)]
struct Counters {
    consecutive_failures: u32,
    window_started: Option<Instant>,
    suspended_until: Option<Instant>,
}

/// Per-target passive health tracker.
#[derive(Debug)]
pub struct HealthTracker {
    policy: HealthPolicy,
    counters: Mutex<Counters>,
}

impl HealthTracker {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request outcome observed at `now`.
    pub fn record_outcome(&self, outcome: Outcome, now: Instant) -> Option<Transition> {
        let mut counters = self.lock();

        // An expired suspension is cleared lazily.
        let suspended = match counters.suspended_until {
            Some(until) if now < until => true,
            Some(_) => {
                counters.suspended_until = None;
                false
            }
            None => false,
        };

        match outcome {
            Outcome::Success => {
                counters.consecutive_failures = 0;
                counters.window_started = None;
                if suspended {
                    counters.suspended_until = None;
                    return Some(Transition::Recovered);
                }
                None
            }
            Outcome::Failure => {
                if suspended {
                    return None;
                }

                let window_expired = counters
                    .window_started
                    .map_or(true, |start| now.saturating_duration_since(start) > self.policy.failure_window);
                if window_expired {
                    counters.window_started = Some(now);
                    counters.consecutive_failures = 0;
                }

                counters.consecutive_failures += 1;
                if counters.consecutive_failures >= self.policy.failure_threshold {
                    let until = now + self.policy.suspension;
                    counters.suspended_until = Some(until);
                    counters.consecutive_failures = 0;
                    counters.window_started = None;
                    return Some(Transition::Suspended { until });
                }
                None
            }
        }
    }

    /// True unless the target is suspended at `now`.
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.lock().suspended_until.map_or(true, |until| now >= until)
    }

    pub fn state(&self, now: Instant) -> HealthState {
        if self.is_eligible(now) {
            HealthState::Up
        } else {
            HealthState::Suspended
        }
    }

    /// Failures counted in the current window.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn suspended_until(&self) -> Option<Instant> {
        self.lock().suspended_until
    }
}
