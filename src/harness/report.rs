//! Verification outcome: aggregate summary, pass criteria, errors.

use serde::Serialize;
use thiserror::Error;

use crate::harness::fault::ChaosMode;
use crate::harness::probe::{Observation, VerificationSample};
use crate::harness::sampler::SampleLog;
use crate::routing::PoolId;

/// Thresholds a sampling run must meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Criteria {
    pub max_non2xx: u64,
    /// Percentage, 0..=100.
    pub min_backup_ratio: f64,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            max_non2xx: 0,
            min_backup_ratio: 95.0,
        }
    }
}

impl Criteria {
    /// Every violated criterion, described with the measured numbers.
    pub fn evaluate(&self, log: &SampleLog) -> Vec<String> {
        let mut violations = Vec::new();
        if log.total() == 0 {
            violations.push("no samples collected".to_string());
            return violations;
        }
        if log.non2xx() > self.max_non2xx {
            violations.push(format!(
                "non2xx = {} of {} samples (allowed {})",
                log.non2xx(),
                log.total(),
                self.max_non2xx
            ));
        }
        if log.backup_ratio() < self.min_backup_ratio {
            violations.push(format!(
                "backup_ratio = {:.2}% ({} of {} samples), required >= {}%",
                log.backup_ratio(),
                log.backup_count(),
                log.total(),
                self.min_backup_ratio
            ));
        }
        violations
    }
}

/// Aggregate result of one verification run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub primary_pool: PoolId,
    pub backup_pool: PoolId,
    pub chaos_mode: ChaosMode,
    pub baseline: Observation,
    pub total: u64,
    pub non2xx: u64,
    pub backup_count: u64,
    pub backup_ratio: f64,
    pub criteria: Criteria,
    pub passed: bool,
    pub cancelled: bool,
    pub samples: Vec<VerificationSample>,
}

impl Summary {
    pub fn new(
        primary: PoolId,
        chaos_mode: ChaosMode,
        baseline: Observation,
        log: SampleLog,
        criteria: Criteria,
        passed: bool,
    ) -> Self {
        Self {
            primary_pool: primary,
            backup_pool: primary.other(),
            chaos_mode,
            baseline,
            total: log.total(),
            non2xx: log.non2xx(),
            backup_count: log.backup_count(),
            backup_ratio: log.backup_ratio(),
            criteria,
            passed,
            cancelled: log.cancelled(),
            samples: log.into_samples(),
        }
    }

    /// Multi-line block for operator output.
    pub fn render(&self) -> String {
        format!(
            "total={}\nnon2xx={}\n{}_count={}\nbackup_ratio={:.2}%\nresult={}",
            self.total,
            self.non2xx,
            self.backup_pool,
            self.backup_count,
            self.backup_ratio,
            if self.passed { "PASS" } else { "FAIL" }
        )
    }
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("setup failed: {0}")]
    Setup(String),

    #[error("baseline check failed: {0}")]
    Baseline(String),

    #[error("fault control failed: {0}")]
    FaultControl(String),

    #[error("verification failed: {}", .violations.join("; "))]
    Assertion {
        summary: Box<Summary>,
        violations: Vec<String>,
    },

    #[error("recovery check failed: {0}")]
    Recovery(String),

    #[error("verification cancelled")]
    Cancelled,
}

impl VerificationError {
    /// Process exit code: 1 for a failed assertion, 2 for everything that
    /// prevented a meaningful measurement.
    pub fn exit_code(&self) -> u8 {
        match self {
            VerificationError::Assertion { .. } => 1,
            _ => 2,
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            VerificationError::Assertion { summary, .. } => Some(summary.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u64, status: u16, pool: &str) -> VerificationSample {
        VerificationSample {
            seq,
            offset_ms: seq * 150,
            observation: Observation {
                status: Some(status),
                pool: Some(pool.to_string()),
                ..Observation::default()
            },
        }
    }

    fn log_of(samples: &[(u16, &str)]) -> SampleLog {
        let mut log = SampleLog::new(PoolId::Green);
        for (i, (status, pool)) in samples.iter().enumerate() {
            log.push(sample(i as u64, *status, pool));
        }
        log
    }

    #[test]
    fn all_backup_passes() {
        let log = log_of(&[(200, "green"); 66]);
        assert!(Criteria::default().evaluate(&log).is_empty());
    }

    #[test]
    fn single_error_fails_with_numbers() {
        let mut samples = vec![(200, "green"); 65];
        samples.push((502, "green"));
        let violations = Criteria::default().evaluate(&log_of(&samples));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("non2xx = 1 of 66"));
    }

    #[test]
    fn low_backup_ratio_fails() {
        // 60 of 66 is 90.9%
        let mut samples = vec![(200, "green"); 60];
        samples.extend(vec![(200, "blue"); 6]);
        let violations = Criteria::default().evaluate(&log_of(&samples));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("90.91%"));
    }

    #[test]
    fn boundary_ratio_passes() {
        let mut samples = vec![(200, "green"); 19];
        samples.push((200, "blue"));
        assert!(Criteria::default().evaluate(&log_of(&samples)).is_empty());
    }

    #[test]
    fn empty_log_fails() {
        let violations = Criteria::default().evaluate(&SampleLog::new(PoolId::Green));
        assert_eq!(violations, vec!["no samples collected".to_string()]);
    }

    #[test]
    fn exit_codes() {
        let summary = Summary::new(
            PoolId::Blue,
            ChaosMode::Error,
            Observation::default(),
            SampleLog::new(PoolId::Green),
            Criteria::default(),
            false,
        );
        let assertion = VerificationError::Assertion {
            summary: Box::new(summary),
            violations: vec!["no samples collected".into()],
        };
        assert_eq!(assertion.exit_code(), 1);
        assert!(assertion.summary().is_some());
        assert_eq!(VerificationError::Baseline("down".into()).exit_code(), 2);
        assert_eq!(VerificationError::FaultControl("refused".into()).exit_code(), 2);
    }

    #[test]
    fn render_names_backup_pool() {
        let summary = Summary::new(
            PoolId::Blue,
            ChaosMode::Error,
            Observation::default(),
            log_of(&[(200, "green"); 4]),
            Criteria::default(),
            true,
        );
        let text = summary.render();
        assert!(text.contains("green_count=4"));
        assert!(text.contains("backup_ratio=100.00%"));
        assert!(text.ends_with("result=PASS"));
    }
}
