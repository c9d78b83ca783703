//! bridgedb.toml configuration parser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transports::{SupportedTransports, TransportRegistry};

/// Default rotation interval: one day, matching the published metrics cadence.
pub const DEFAULT_METRICS_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeDbConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// `SUPPORTED_TRANSPORTS`: transport name → currently distributed.
    #[serde(default = "default_transports")]
    pub transports: HashMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between rotations (and exports).
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// File each export document is appended to.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for BridgeDbConfig {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            transports: default_transports(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            output: default_output(),
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_METRICS_INTERVAL_SECS
}

fn default_output() -> PathBuf {
    PathBuf::from("bridgedb-metrics.log")
}

fn default_transports() -> SupportedTransports {
    [
        ("obfs2", false),
        ("obfs3", true),
        ("obfs4", true),
        ("scramblesuit", true),
        ("fte", true),
    ]
    .into_iter()
    .map(|(name, on)| (name.to_string(), on))
    .collect()
}

impl BridgeDbConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeDbConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.interval == 0 {
            return Err(ConfigError::Invalid(
                "metrics.interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.interval)
    }

    /// Build the shared transport registry from the `[transports]` table.
    pub fn transport_registry(&self) -> TransportRegistry {
        TransportRegistry::new(self.transports.clone())
    }
}
