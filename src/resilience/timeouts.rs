//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Classify attempt errors (connect, transport, body, timeout)
//! - Map attempt errors to gateway status codes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the future is dropped on expiry,
//!   which releases the upstream connection
//! - Timed-out attempts surface as 504 Gateway Timeout, others as 502

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use axum::http::StatusCode;
use thiserror::Error;

/// Why a single upstream attempt failed without a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Connection could not be established; the request was never sent.
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("failed reading upstream body: {0}")]
    Body(String),

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl AttemptError {
    pub fn from_client(err: hyper_util::client::legacy::Error) -> Self {
        let detail = error_chain(&err);
        if err.is_connect() {
            AttemptError::Connect(detail)
        } else {
            AttemptError::Transport(detail)
        }
    }

    /// False only when the backend provably never saw the request.
    pub fn request_may_have_been_sent(&self) -> bool {
        !matches!(self, AttemptError::Connect(_))
    }

    /// Status synthesized for the client when this is the final failure.
    pub fn gateway_status(&self) -> StatusCode {
        match self {
            AttemptError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Connect(_) => "connect",
            AttemptError::Transport(_) => "transport",
            AttemptError::Body(_) => "body",
            AttemptError::Timeout(_) => "timeout",
        }
    }
}

/// Run `fut` with a hard deadline.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, AttemptError>
where
    F: Future<Output = Result<T, AttemptError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AttemptError::Timeout(deadline)),
    }
}

/// Render an error with its source chain (hyper's top-level messages are terse).
pub fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let result: Result<(), _> = with_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(AttemptError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok::<_, AttemptError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(AttemptError::Connect("refused".into()))
        })
        .await;
        assert_eq!(err, Err(AttemptError::Connect("refused".into())));
    }

    #[test]
    fn gateway_status_mapping() {
        assert_eq!(
            AttemptError::Timeout(Duration::from_secs(1)).gateway_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(AttemptError::Connect("x".into()).gateway_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AttemptError::Body("x".into()).gateway_status(), StatusCode::BAD_GATEWAY);
        assert!(!AttemptError::Connect("x".into()).request_may_have_been_sent());
        assert!(AttemptError::Timeout(Duration::from_secs(1)).request_may_have_been_sent());
    }
}
