//! Response handling and transformation.
//!
//! # Responsibilities
//! - Return the selected backend response verbatim (status, headers, body)
//! - Strip hop-by-hop headers, never the preserved allow-list
//! - Synthesize gateway failures when no backend produced a response
//!
//! # Design Decisions
//! - Backend timeouts result in 504 Gateway Timeout, other transport errors in 502
//! - Upstream bodies are already buffered; Content-Length stays accurate

use axum::body::{Body, Bytes};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::http::headers::{strip_hop_by_hop, PreservedHeaders};

/// Convert a buffered upstream response into the client response.
pub fn from_upstream(response: Response<Bytes>, preserved: &PreservedHeaders) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers, preserved);
    Response::from_parts(parts, Body::from(body))
}

/// Response for the case where every attempt failed without an HTTP answer.
pub fn gateway_failure(status: StatusCode) -> Response<Body> {
    let message = match status {
        StatusCode::GATEWAY_TIMEOUT => "Upstream request timed out",
        _ => "Upstream request failed",
    };
    (status, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::HeaderConfig;

    #[test]
    fn upstream_response_passes_through() {
        let upstream = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("x-app-pool", "green")
            .header("x-release-id", "green-v2")
            .header("transfer-encoding", "chunked")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{\"error\":\"missing\"}"))
            .unwrap();

        let response = from_upstream(upstream, &PreservedHeaders::from_config(&HeaderConfig::default()));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-app-pool").unwrap(), "green");
        assert_eq!(response.headers().get("x-release-id").unwrap(), "green-v2");
        assert_eq!(response.headers().get("content-type").unwrap(), "application/json");
        assert!(response.headers().get("transfer-encoding").is_none());
    }

    #[test]
    fn synthesized_failures() {
        assert_eq!(gateway_failure(StatusCode::BAD_GATEWAY).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            gateway_failure(StatusCode::GATEWAY_TIMEOUT).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
