//! Command-line and environment overrides.
//!
//! Each flag falls back to an environment variable, so the proxy can be
//! parameterized entirely from a container environment. Flags win over env,
//! both win over the config file.

use clap::Args;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Designated primary pool (blue or green)
    #[arg(long, env = "ACTIVE_POOL")]
    pub active_pool: Option<String>,

    /// Blue pool upstream (host:port)
    #[arg(long, env = "BLUE_UPSTREAM")]
    pub blue_upstream: Option<String>,

    /// Green pool upstream (host:port)
    #[arg(long, env = "GREEN_UPSTREAM")]
    pub green_upstream: Option<String>,

    /// Public listen address
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Expose Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_address: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(pool) = &self.active_pool {
            config.pools.active_pool = pool.clone();
        }
        if let Some(addr) = &self.blue_upstream {
            config.pools.blue_address = addr.clone();
        }
        if let Some(addr) = &self.green_upstream {
            config.pools.green_address = addr.clone();
        }
        if let Some(addr) = &self.listen {
            config.listener.bind_address = addr.clone();
        }
        if let Some(addr) = &self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr.clone();
        }
    }
}
