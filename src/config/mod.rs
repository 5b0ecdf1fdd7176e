//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → overrides.rs (flags / environment variables)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use overrides::ConfigOverrides;
pub use schema::{
    HeaderConfig, HealthConfig, ListenerConfig, LogFormat, ObservabilityConfig, PoolsConfig,
    ProbeConfig, ProxyConfig, RetryConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
