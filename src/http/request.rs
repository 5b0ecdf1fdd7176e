//! Request handling and transformation.
//!
//! # Responsibilities
//! - Assign a request ID (UUID v4) as early as possible and echo it back
//! - Build the upstream request for one attempt from the buffered original
//!
//! # Design Decisions
//! - The original request parts are kept; each attempt gets a fresh copy
//! - The client's Host header is forwarded unchanged

use std::net::SocketAddr;
use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::headers::{append_forwarded, strip_hop_by_hop, PreservedHeaders};
use crate::routing::UpstreamTarget;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that stamps `x-request-id` on requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid)
}

/// Layer that copies `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID.clone())
}

/// Request ID of an inbound request, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the request for one attempt against `target`.
pub fn build_upstream_request(
    parts: &Parts,
    body: Bytes,
    target: &UpstreamTarget,
    client: SocketAddr,
) -> Result<Request<Body>, axum::http::Error> {
    let uri = target.upstream_uri(&parts.uri)?;

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers, &PreservedHeaders::default());
    append_forwarded(&mut headers, client);

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(Body::from(body))?;
    *request.headers_mut() = headers;
    Ok(request)
}
