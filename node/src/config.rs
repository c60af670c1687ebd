//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use agora_governance::GovernanceParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Where governance state is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process maps; state is lost on exit.
    Memory,
    /// An LMDB environment under `data_dir`.
    #[default]
    Lmdb,
}

/// Configuration for an Agora node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageBackend,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Tally and lifecycle parameters. Must match on every replica.
    #[serde(default)]
    pub governance: GovernanceParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// The configured log format.
    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            lmdb_map_size: default_lmdb_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            governance: GovernanceParams::default(),
        }
    }
}
