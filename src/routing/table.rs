//! Routing table and per-request attempt ordering.
//!
//! # Responsibilities
//! - Resolve primary/backup from the designated-primary indicator
//! - Hold exactly two targets, primary first
//! - Produce the attempt order for one request from current health
//!
//! # Design Decisions
//! - Immutable after construction (order and identities need no locks)
//! - A suspended target is skipped only while another eligible target remains;
//!   when every target is suspended the full primary-first order is used

use std::time::Instant;

use crate::config::schema::PoolsConfig;
use crate::config::validation::ValidationError;
use crate::health::state::HealthPolicy;
use crate::routing::target::{parse_authority, PoolId, Role, UpstreamTarget};

/// Ordered primary-then-backup target list.
#[derive(Debug)]
pub struct RoutingTable {
    targets: [UpstreamTarget; 2],
}

/// Attempt order for a single client request.
#[derive(Debug)]
pub struct AttemptPlan<'a> {
    pub targets: Vec<&'a UpstreamTarget>,
    /// Every target was suspended; the order ignores health.
    pub degraded: bool,
}

impl RoutingTable {
    /// Resolve the table from pool configuration.
    pub fn from_config(pools: &PoolsConfig, policy: HealthPolicy) -> Result<Self, ValidationError> {
        let primary: PoolId = pools
            .active_pool
            .parse()
            .map_err(|_| ValidationError::UnknownPool(pools.active_pool.clone()))?;
        let backup = primary.other();

        let address_of = |pool: PoolId| match pool {
            PoolId::Blue => ("pools.blue_address", pools.blue_address.as_str()),
            PoolId::Green => ("pools.green_address", pools.green_address.as_str()),
        };

        let resolve = |pool: PoolId, role: Role| {
            let (field, address) = address_of(pool);
            parse_authority(address)
                .map(|authority| UpstreamTarget::new(pool, role, authority, policy))
                .map_err(|reason| ValidationError::InvalidAddress {
                    field,
                    value: address.to_string(),
                    reason,
                })
        };

        Ok(Self {
            targets: [resolve(primary, Role::Primary)?, resolve(backup, Role::Backup)?],
        })
    }

    pub fn primary(&self) -> &UpstreamTarget {
        &self.targets[0]
    }

    pub fn backup(&self) -> &UpstreamTarget {
        &self.targets[1]
    }

    /// All targets, primary first.
    pub fn targets(&self) -> &[UpstreamTarget] {
        &self.targets
    }

    pub fn target_for(&self, pool: PoolId) -> &UpstreamTarget {
        if self.primary().pool() == pool {
            self.primary()
        } else {
            self.backup()
        }
    }

    /// Build the attempt order at `now`.
    pub fn attempt_order(&self, now: Instant) -> AttemptPlan<'_> {
        let eligible: Vec<&UpstreamTarget> = self
            .targets
            .iter()
            .filter(|t| t.health().is_eligible(now))
            .collect();

        if eligible.is_empty() {
            AttemptPlan {
                targets: self.targets.iter().collect(),
                degraded: true,
            }
        } else {
            AttemptPlan {
                targets: eligible,
                degraded: false,
            }
        }
    }
}
