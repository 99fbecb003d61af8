//! Runtime configuration.
//!
//! Defaults, then TOML files, then `TRELLIS_*` environment variables.
//! See [`ConfigLoader`] for the layering and [`TrellisConfig`] for the
//! file format.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    AccessConfig, ClientConfig, ConditionConfig, LogFormat, LoggingConfig, ResolverConfig,
    TransportConfig, TrellisConfig,
};
