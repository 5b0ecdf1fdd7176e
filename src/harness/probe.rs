//! Probing the proxy's public endpoint.
//!
//! One probe is one GET against the status path. The result records what a
//! client would see: status, pool label, release id.

use std::future::Future;
use std::time::{Duration, Instant};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

pub const POOL_HEADER: &str = "x-app-pool";
pub const RELEASE_HEADER: &str = "x-release-id";

/// What one request against the public endpoint observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub status: Option<u16>,
    pub pool: Option<String>,
    pub release: Option<String>,
    /// Transport error, when no HTTP response arrived.
    pub error: Option<String>,
    pub request_id: String,
    pub elapsed_ms: u64,
}

impl Observation {
    pub fn is_ok(&self) -> bool {
        self.status == Some(200)
    }

    pub fn served_by(&self, pool: &str) -> bool {
        self.pool
            .as_deref()
            .is_some_and(|label| label.eq_ignore_ascii_case(pool))
    }

    /// Compact form for operator output.
    pub fn describe(&self) -> String {
        match (&self.status, &self.error) {
            (Some(status), _) => format!(
                "status={} pool={} release={} ({}ms)",
                status,
                self.pool.as_deref().unwrap_or("-"),
                self.release.as_deref().unwrap_or("-"),
                self.elapsed_ms
            ),
            (None, Some(error)) => format!("error={} ({}ms)", error, self.elapsed_ms),
            (None, None) => format!("no response ({}ms)", self.elapsed_ms),
        }
    }
}

/// One polling tick's observation, stamped with its offset from the start of
/// sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationSample {
    pub seq: u64,
    pub offset_ms: u64,
    #[serde(flatten)]
    pub observation: Observation,
}

/// Something that can observe the public endpoint once.
pub trait Probe {
    fn observe(&self) -> impl Future<Output = Observation> + Send;
}

/// Probe that issues real HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(base: &Url, status_path: &str, timeout: Duration) -> Result<Self, String> {
        let url = base
            .join(status_path)
            .map_err(|e| format!("invalid status path '{status_path}': {e}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Probe for HttpProbe {
    async fn observe(&self) -> Observation {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let result = self
            .client
            .get(self.url.clone())
            .header("x-request-id", &request_id)
            .send()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let header = |name: &str| {
                    response
                        .headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                Observation {
                    status: Some(response.status().as_u16()),
                    pool: header(POOL_HEADER),
                    release: header(RELEASE_HEADER),
                    error: None,
                    request_id,
                    elapsed_ms,
                }
            }
            Err(e) => Observation {
                error: Some(if e.is_timeout() {
                    "timeout".to_string()
                } else {
                    e.to_string()
                }),
                request_id,
                elapsed_ms,
                ..Observation::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_helpers() {
        let ok = Observation {
            status: Some(200),
            pool: Some("Green".into()),
            release: Some("green-v2".into()),
            ..Observation::default()
        };
        assert!(ok.is_ok());
        assert!(ok.served_by("green"));
        assert!(!ok.served_by("blue"));
        assert!(ok.describe().contains("pool=Green"));

        let failed = Observation {
            error: Some("timeout".into()),
            ..Observation::default()
        };
        assert!(!failed.is_ok());
        assert!(!failed.served_by("green"));
        assert!(failed.describe().starts_with("error=timeout"));
    }

    #[test]
    fn probe_url_joins_status_path() {
        let base: Url = "http://localhost:8080".parse().unwrap();
        let probe = HttpProbe::new(&base, "/version", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.url().as_str(), "http://localhost:8080/version");
    }
}
