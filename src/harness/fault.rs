//! Fault injection against the primary backend.
//!
//! The backend exposes `POST /chaos/start?mode=<mode>` and
//! `POST /chaos/stop`, reached directly rather than through the proxy.
//! An active fault is held as a [`FaultInjection`]; dropping it without
//! calling [`FaultInjection::release`] still issues a best-effort stop.

use std::fmt;
use std::time::Duration;
use clap::ValueEnum;
use serde::Serialize;
use url::Url;

use crate::harness::report::VerificationError;

/// Failure mode requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosMode {
    /// Backend answers with 5xx.
    Error,
    /// Backend stalls without answering.
    Timeout,
}

impl ChaosMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChaosMode::Error => "error",
            ChaosMode::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ChaosMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FaultController {
    client: reqwest::Client,
    base: Url,
}

impl FaultController {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { client, base })
    }

    /// Put the backend into `mode`. The returned guard owns the fault.
    pub async fn start(&self, mode: ChaosMode) -> Result<FaultInjection, VerificationError> {
        let mut url = self.endpoint("chaos/start")?;
        url.query_pairs_mut().append_pair("mode", mode.as_str());
        self.post(url).await?;

        tracing::info!(target_url = %self.base, mode = %mode, "Fault injected");
        Ok(FaultInjection {
            controller: self.clone(),
            mode,
            released: false,
        })
    }

    /// Return the backend to normal operation.
    pub async fn stop(&self) -> Result<(), VerificationError> {
        let url = self.endpoint("chaos/stop")?;
        self.post(url).await?;
        tracing::info!(target_url = %self.base, "Fault cleared");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, VerificationError> {
        self.base
            .join(path)
            .map_err(|e| VerificationError::FaultControl(format!("invalid control URL: {e}")))
    }

    async fn post(&self, url: Url) -> Result<(), VerificationError> {
        let response = self
            .client
            .post(url.clone())
            .send()
            .await
            .map_err(|e| VerificationError::FaultControl(format!("POST {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(VerificationError::FaultControl(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// An active fault on the primary backend.
#[must_use = "an injected fault stays active until released"]
pub struct FaultInjection {
    controller: FaultController,
    mode: ChaosMode,
    released: bool,
}

impl FaultInjection {
    pub fn mode(&self) -> ChaosMode {
        self.mode
    }

    /// Stop the fault and wait for the backend to acknowledge.
    pub async fn release(mut self) -> Result<(), VerificationError> {
        self.released = true;
        self.controller.stop().await
    }
}

impl Drop for FaultInjection {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(mode = %self.mode, "Fault dropped without release, stopping in background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let controller = self.controller.clone();
            handle.spawn(async move {
                if let Err(e) = controller.stop().await {
                    tracing::error!(error = %e, "Background fault cleanup failed");
                }
            });
        }
    }
}
