//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured level when it is set and valid.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
    Registry,
};

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Full => fmt::layer().with_target(false).boxed(),
        LogFormat::Compact => fmt::layer().with_target(false).compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter_for(config)))
        .try_init()
}

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
