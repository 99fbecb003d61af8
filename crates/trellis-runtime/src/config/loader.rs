//! Configuration loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values
//! 2. Each file added with [`ConfigLoader::with_file`], in order
//! 3. Environment variables (`TRELLIS_*`)
//!
//! Each layer overrides the previous.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TRELLIS_LOG_LEVEL` | `logging.level` |
//! | `TRELLIS_LOG_FORMAT` | `logging.format` (`full` or `compact`) |
//! | `TRELLIS_DEFAULT_NAMESPACE` | `transport.default_namespace` |
//! | `TRELLIS_ACK_TIMEOUT_MS` | `client.ack_timeout_ms` |

use super::{ConfigError, LogFormat, TrellisConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use trellis_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_file("/etc/trellis/config.toml")
///     .with_file("trellis.toml")
///     .load()?;
/// # Ok::<(), trellis_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    files: Vec<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file layer. Later files override earlier ones.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file exists but cannot be read or
    /// parsed, or an environment variable holds an invalid value. Missing
    /// files are ignored.
    pub fn load(&self) -> Result<TrellisConfig, ConfigError> {
        let mut config = TrellisConfig::default();

        for path in &self.files {
            if let Some(layer) = load_file(path)? {
                debug!(path = %path.display(), "Loaded config layer");
                config.merge(&layer);
            }
        }

        if !self.skip_env {
            apply_env_vars(&mut config, |name| std::env::var(name).ok())?;
        }

        Ok(config)
    }
}

/// Loads a config file, returning None if it doesn't exist.
fn load_file(path: &Path) -> Result<Option<TrellisConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config =
        TrellisConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(Some(config))
}

fn apply_env_vars<F>(config: &mut TrellisConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup("TRELLIS_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(format) = lookup("TRELLIS_LOG_FORMAT") {
        config.logging.format = LogFormat::parse(&format).ok_or_else(|| {
            ConfigError::invalid_env_var("TRELLIS_LOG_FORMAT", "expected full or compact")
        })?;
    }

    if let Some(namespace) = lookup("TRELLIS_DEFAULT_NAMESPACE") {
        config.transport.default_namespace = namespace;
    }

    if let Some(timeout) = lookup("TRELLIS_ACK_TIMEOUT_MS") {
        let ms = timeout.trim().parse::<u64>().map_err(|e| {
            ConfigError::invalid_env_var("TRELLIS_ACK_TIMEOUT_MS", e.to_string())
        })?;
        config.client.ack_timeout_ms = Some(ms);
    }

    Ok(())
}
