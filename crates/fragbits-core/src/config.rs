//! Configuration management for the fragbits system.
//!
//! Configuration is layered: defaults baked into the types, overridden by
//! `config/default.toml`, then `config/{FRAGBITS_ENV}.toml`, then
//! environment variables with the `FRAGBITS` prefix (double underscore as
//! the section separator, e.g. `FRAGBITS__BUILD__CUTOFF=0.6`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the on-disk databases.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Fingerprint store directory.
    #[serde(default = "default_fingerprints_path")]
    pub fingerprints_path: PathBuf,
    /// Neighbor index directory.
    #[serde(default = "default_neighbors_path")]
    pub neighbors_path: PathBuf,
}

/// Parameters of the pairs build.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Minimum similarity score persisted into the neighbor index.
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive when no verbosity flag is given.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_fingerprints_path() -> PathBuf {
    PathBuf::from("data/fingerprints.db")
}

fn default_neighbors_path() -> PathBuf {
    PathBuf::from("data/neighbors.db")
}

fn default_cutoff() -> f64 {
    0.45
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fingerprints_path: default_fingerprints_path(),
            neighbors_path: default_neighbors_path(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Sources, later entries winning:
    /// 1. `config/default.toml` (optional)
    /// 2. `config/{FRAGBITS_ENV}.toml` (optional, default env `development`)
    /// 3. Environment variables with the `FRAGBITS` prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("FRAGBITS_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(config::Environment::with_prefix("FRAGBITS").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.build.cutoff) {
            return Err(CoreError::ConfigError(format!(
                "build.cutoff must be within [0, 1], got {}",
                self.build.cutoff
            )));
        }
        if self.logging.level.is_empty() {
            return Err(CoreError::ConfigError(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
