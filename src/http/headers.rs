//! Header manipulation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Never strip headers on the preserved allow-list (pool/release identity)
//! - Add X-Forwarded-For and X-Forwarded-Proto upstream
//!
//! # Design Decisions
//! - Headers named by `Connection` are treated as hop-by-hop too
//! - Existing X-Forwarded-For is appended to, not replaced

use std::net::SocketAddr;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};

use crate::config::schema::HeaderConfig;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Response headers that must reach the client untouched.
#[derive(Debug, Clone, Default)]
pub struct PreservedHeaders(Vec<HeaderName>);

impl PreservedHeaders {
    pub fn from_config(config: &HeaderConfig) -> Self {
        Self(
            config
                .preserve
                .iter()
                .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
                .collect(),
        )
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.0.contains(name)
    }

    pub fn names(&self) -> &[HeaderName] {
        &self.0
    }
}

/// Remove hop-by-hop headers, sparing preserved names.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, preserved: &PreservedHeaders) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let doomed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_hop_by_hop(name) || listed.contains(name))
        .filter(|name| !preserved.contains(name))
        .cloned()
        .collect();

    for name in doomed {
        headers.remove(&name);
    }
}

/// Record the client hop in X-Forwarded-* headers.
pub fn append_forwarded(headers: &mut HeaderMap, client: SocketAddr) {
    let client_ip = client.ip().to_string();
    let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::TRANSFER_ENCODING;

    fn preserved() -> PreservedHeaders {
        PreservedHeaders::from_config(&HeaderConfig::default())
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-internal"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("x-internal", HeaderValue::from_static("1"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers, &preserved());

        assert!(headers.get(CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get(TRANSFER_ENCODING).is_none());
        assert!(headers.get("x-internal").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn preserved_headers_survive_even_if_listed() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("x-app-pool, x-release-id"));
        headers.insert("x-app-pool", HeaderValue::from_static("blue"));
        headers.insert("x-release-id", HeaderValue::from_static("blue-v1.0.0"));

        strip_hop_by_hop(&mut headers, &preserved());

        assert_eq!(headers.get("x-app-pool").unwrap(), "blue");
        assert_eq!(headers.get("x-release-id").unwrap(), "blue-v1.0.0");
    }

    #[test]
    fn preserved_names_are_case_insensitive() {
        let config = HeaderConfig {
            preserve: vec!["X-App-Pool".into()],
        };
        let preserved = PreservedHeaders::from_config(&config);
        assert!(preserved.contains(&HeaderName::from_static("x-app-pool")));
    }

    #[test]
    fn forwarded_for_is_appended() {
        let client: SocketAddr = "10.1.2.3:5555".parse().unwrap();

        let mut headers = HeaderMap::new();
        append_forwarded(&mut headers, client);
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.1.2.3");
        assert_eq!(headers.get(&X_FORWARDED_PROTO).unwrap(), "http");

        let mut headers = HeaderMap::new();
        headers.insert(&X_FORWARDED_FOR, HeaderValue::from_static("192.0.2.1"));
        append_forwarded(&mut headers, client);
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "192.0.2.1, 10.1.2.3");
    }
}
