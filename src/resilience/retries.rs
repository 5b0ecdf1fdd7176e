//! Retry logic.
//!
//! # Responsibilities
//! - Classify attempt results as qualifying success or failure
//! - Decide whether the next target may be tried (attempts, method, budget)
//! - Derive each attempt's deadline from the remaining time budget
//!
//! # Design Decisions
//! - Failover is immediate: the next attempt goes to a different target,
//!   so there is no backoff
//! - Statuses outside the retriable set (including every 4xx) are returned
//!   to the client as-is; masking them would hide application errors
//! - Non-idempotent requests fail over only if the request never left the
//!   proxy, unless explicitly enabled
//! - The budget is a hard cap: no attempt starts or runs past it

use std::time::Duration;
use axum::http::{Method, StatusCode};

use crate::config::schema::{RetryConfig, TimeoutConfig};
use crate::health::state::Outcome;
use crate::resilience::timeouts::AttemptError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    budget: Duration,
    attempt_timeout: Duration,
    retriable: Vec<StatusCode>,
    retry_non_idempotent: bool,
}

impl RetryPolicy {
    pub fn from_config(retries: &RetryConfig, timeouts: &TimeoutConfig) -> Self {
        let retriable = retries
            .retriable_statuses
            .iter()
            .filter_map(|code| StatusCode::from_u16(*code).ok())
            .collect();

        Self {
            max_attempts: retries.max_attempts.max(1) as usize,
            budget: retries.budget(),
            attempt_timeout: timeouts.attempt(),
            retriable,
            retry_non_idempotent: retries.retry_non_idempotent,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_retriable_status(&self, status: StatusCode) -> bool {
        self.retriable.contains(&status)
    }

    /// Health outcome for an attempt: transport errors and retriable
    /// statuses are failures, any other response is a success.
    pub fn classify(&self, result: &Result<StatusCode, AttemptError>) -> Outcome {
        match result {
            Ok(status) if !self.is_retriable_status(*status) => Outcome::Success,
            _ => Outcome::Failure,
        }
    }

    /// Deadline for an attempt starting after `elapsed`, or `None` once the
    /// budget is spent.
    pub fn attempt_deadline(&self, elapsed: Duration) -> Option<Duration> {
        let remaining = self.budget.checked_sub(elapsed).filter(|r| !r.is_zero())?;
        Some(self.attempt_timeout.min(remaining))
    }

    /// Whether a failed attempt may be replayed against another target.
    pub fn may_fail_over(&self, method: &Method, error: Option<&AttemptError>) -> bool {
        if method.is_idempotent() || self.retry_non_idempotent {
            return true;
        }
        matches!(error, Some(e) if !e.request_may_have_been_sent())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &TimeoutConfig::default())
    }
}
