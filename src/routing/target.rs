//! Upstream target abstraction.
//!
//! # Responsibilities
//! - Name the two interchangeable pools (blue, green)
//! - Represent a single upstream target with its role and address
//! - Own the per-target health tracker
//!
//! Targets are created once at bootstrap and live for the whole process.

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::health::state::{HealthPolicy, HealthTracker};

/// Pool identifier as supplied by the designated-primary indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolId {
    Blue,
    Green,
}

impl PoolId {
    /// The other pool.
    pub fn other(self) -> Self {
        match self {
            PoolId::Blue => PoolId::Green,
            PoolId::Green => PoolId::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolId::Blue => "blue",
            PoolId::Green => "green",
        }
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a pool indicator is neither "blue" nor "green".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pool '{0}': expected 'blue' or 'green'")]
pub struct UnknownPool(pub String);

impl FromStr for PoolId {
    type Err = UnknownPool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(PoolId::Blue),
            "green" => Ok(PoolId::Green),
            _ => Err(UnknownPool(s.to_string())),
        }
    }
}

/// Role of a target in the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Backup,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => f.write_str("primary"),
            Role::Backup => f.write_str("backup"),
        }
    }
}

/// Parse a `host:port` upstream address. The port is mandatory.
pub fn parse_authority(address: &str) -> Result<Authority, String> {
    let address = address.trim();
    if address.is_empty() {
        return Err("address is empty".to_string());
    }
    if address.contains('/') || address.contains('@') {
        return Err("expected host:port without scheme, path or userinfo".to_string());
    }
    let authority = Authority::from_str(address).map_err(|e| e.to_string())?;
    if authority.host().is_empty() {
        return Err("missing host".to_string());
    }
    match authority.port_u16() {
        Some(0) => Err("port must be non-zero".to_string()),
        Some(_) => Ok(authority),
        None => Err("missing port".to_string()),
    }
}

/// A single upstream target.
#[derive(Debug)]
pub struct UpstreamTarget {
    pool: PoolId,
    role: Role,
    authority: Authority,
    health: HealthTracker,
}

impl UpstreamTarget {
    pub fn new(pool: PoolId, role: Role, authority: Authority, policy: HealthPolicy) -> Self {
        Self {
            pool,
            role,
            authority,
            health: HealthTracker::new(policy),
        }
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Rewrite a client URI so it points at this target.
    pub fn upstream_uri(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}
