//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the merged configuration
//! - Resolve the routing table (primary/backup)
//! - Refuse to start on any inconsistency
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and not retried
//! - The configuration is frozen behind an Arc once accepted

use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::health::state::HealthPolicy;
use crate::routing::RoutingTable;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    InvalidConfig(Vec<ValidationError>),
}

/// Everything the request path needs, resolved once.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub config: Arc<ProxyConfig>,
    pub table: Arc<RoutingTable>,
}

pub fn bootstrap(config: ProxyConfig) -> Result<Bootstrap, StartupError> {
    validate_config(&config).map_err(StartupError::InvalidConfig)?;

    let policy = HealthPolicy::from_config(&config.health);
    let table = RoutingTable::from_config(&config.pools, policy)
        .map_err(|e| StartupError::InvalidConfig(vec![e]))?;

    tracing::info!(
        primary = %table.primary().pool(),
        primary_address = %table.primary().authority(),
        backup = %table.backup().pool(),
        backup_address = %table.backup().authority(),
        "Routing table resolved"
    );

    Ok(Bootstrap {
        config: Arc::new(config),
        table: Arc::new(table),
    })
}
