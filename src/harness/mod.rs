//! Failover verification harness.
//!
//! # Data Flow
//! ```text
//! baseline probe (must be 200 from the primary)
//!     → inject fault on the primary (fault.rs)
//!     → sample the public endpoint until the deadline (sampler.rs)
//!     → release the fault, always
//!     → evaluate criteria (report.rs)
//!     → optional recovery probe (must be the primary again)
//! ```
//!
//! The harness is a black-box client. It touches the proxy only through its
//! public endpoint and the primary only through the fault-control endpoints.

pub mod fault;
pub mod probe;
pub mod report;
pub mod sampler;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::routing::PoolId;

pub use fault::{ChaosMode, FaultController, FaultInjection};
pub use probe::{HttpProbe, Observation, Probe, VerificationSample};
pub use report::{Criteria, Summary, VerificationError};
pub use sampler::{SampleLog, Sampler};

/// Everything one verification run needs.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub proxy_url: Url,
    pub primary_url: Url,
    pub primary_pool: PoolId,
    pub status_path: String,
    pub chaos_mode: ChaosMode,
    pub duration: Duration,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub criteria: Criteria,
    /// Wait this long after cleanup, then require the primary to serve again.
    pub recovery_wait: Option<Duration>,
}

/// Progress notifications for operator output.
#[derive(Debug)]
pub enum Progress<'a> {
    Baseline(&'a Observation),
    FaultInjected(ChaosMode),
    Sample(&'a VerificationSample),
    FaultReleased,
    Recovery(&'a Observation),
}

/// Run baseline, fault injection, sampling and evaluation against live
/// endpoints.
pub async fn run_verification<F>(
    config: &HarnessConfig,
    cancel: &CancellationToken,
    on_progress: F,
) -> Result<Summary, VerificationError>
where
    F: FnMut(Progress<'_>),
{
    let probe = HttpProbe::new(&config.proxy_url, &config.status_path, config.request_timeout)
        .map_err(VerificationError::Setup)?;
    let controller = FaultController::new(config.primary_url.clone(), config.request_timeout)
        .map_err(VerificationError::Setup)?;

    verify_with(config, &probe, &controller, cancel, on_progress).await
}

/// Same as [`run_verification`] with an explicit probe.
pub async fn verify_with<P, F>(
    config: &HarnessConfig,
    probe: &P,
    controller: &FaultController,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Summary, VerificationError>
where
    P: Probe,
    F: FnMut(Progress<'_>),
{
    if config.duration.is_zero() || config.interval.is_zero() {
        return Err(VerificationError::Setup(format!(
            "duration and interval must be non-zero (got {}ms and {}ms)",
            config.duration.as_millis(),
            config.interval.as_millis()
        )));
    }

    let primary = config.primary_pool;
    let backup = primary.other();

    let baseline = probe.observe().await;
    on_progress(Progress::Baseline(&baseline));
    if !baseline.is_ok() || !baseline.served_by(primary.as_str()) {
        return Err(VerificationError::Baseline(format!(
            "expected 200 from {primary}, got {}",
            baseline.describe()
        )));
    }

    // The backend may have applied the mode before reporting an error.
    let injection = match controller.start(config.chaos_mode).await {
        Ok(injection) => injection,
        Err(e) => {
            if let Err(stop) = controller.stop().await {
                tracing::warn!(error = %stop, "Fault cleanup failed after start error");
            }
            return Err(e);
        }
    };
    on_progress(Progress::FaultInjected(injection.mode()));

    let sampler = Sampler {
        duration: config.duration,
        interval: config.interval,
    };
    let log = sampler
        .run(probe, backup, cancel, |sample| on_progress(Progress::Sample(sample)))
        .await;

    let cleanup = injection.release().await;
    if cleanup.is_ok() {
        on_progress(Progress::FaultReleased);
    }

    if log.cancelled() {
        if let Err(e) = cleanup {
            tracing::error!(error = %e, "Fault cleanup failed after cancellation");
        }
        return Err(VerificationError::Cancelled);
    }

    let violations = config.criteria.evaluate(&log);
    let summary = Summary::new(
        primary,
        config.chaos_mode,
        baseline,
        log,
        config.criteria,
        violations.is_empty(),
    );
    tracing::info!(
        total = summary.total,
        non2xx = summary.non2xx,
        backup_count = summary.backup_count,
        backup_ratio = summary.backup_ratio,
        passed = summary.passed,
        "Sampling complete"
    );

    if !violations.is_empty() {
        if let Err(e) = cleanup {
            tracing::error!(error = %e, "Fault cleanup failed after assertion failure");
        }
        return Err(VerificationError::Assertion {
            summary: Box::new(summary),
            violations,
        });
    }
    cleanup?;

    if let Some(wait) = config.recovery_wait {
        tokio::select! {
            _ = cancel.cancelled() => return Err(VerificationError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
        let recovered = probe.observe().await;
        on_progress(Progress::Recovery(&recovered));
        if !recovered.is_ok() || !recovered.served_by(primary.as_str()) {
            return Err(VerificationError::Recovery(format!(
                "expected 200 from {primary} after {}ms, got {}",
                wait.as_millis(),
                recovered.describe()
            )));
        }
    }

    Ok(summary)
}
