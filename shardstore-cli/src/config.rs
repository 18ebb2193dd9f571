//! Configuration management
//!
//! Handles storing and loading CLI configuration.
//! Config directory: ~/.shardstore/ (cross-platform)
//!
//! Config file format (~/.shardstore/config.toml):
//! ```toml
//! [store]
//! data_shards = 4
//! parity_shards = 2
//! base_dir = "/srv/shardstore/mnt"
//! ```
//!
//! Precedence: command-line flag / environment variable, then config file,
//! then built-in defaults. Settings are resolved once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shardstore_core::{DATA_SHARDS, PARITY_SHARDS};
use std::fs;
use std::path::{Path, PathBuf};

/// Structure of ~/.shardstore/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ShardStoreConfig {
    /// Store settings
    #[serde(default)]
    pub store: StoreSection,
}

/// Erasure coding and target settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSection {
    /// Number of data shards (k)
    #[serde(default = "default_data_shards")]
    pub data_shards: usize,

    /// Number of parity shards (m)
    #[serde(default = "default_parity_shards")]
    pub parity_shards: usize,

    /// Directory whose children are the targets (default: ./.workdir/mnt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            data_shards: default_data_shards(),
            parity_shards: default_parity_shards(),
            base_dir: None,
        }
    }
}

fn default_data_shards() -> usize {
    DATA_SHARDS
}

fn default_parity_shards() -> usize {
    PARITY_SHARDS
}

/// Overrides taken from the command line (or their environment variables)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_shards: Option<usize>,
    pub parity_shards: Option<usize>,
    pub base_dir: Option<PathBuf>,
}

/// Fully resolved settings, fixed for the rest of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub data_shards: usize,
    pub parity_shards: usize,
    pub base_dir: PathBuf,
}

impl ShardStoreConfig {
    /// Apply overrides on top of this config. `cwd` anchors the default
    /// base directory.
    pub fn resolve(&self, overrides: Overrides, cwd: &Path) -> StoreSettings {
        StoreSettings {
            data_shards: overrides.data_shards.unwrap_or(self.store.data_shards),
            parity_shards: overrides
                .parity_shards
                .unwrap_or(self.store.parity_shards),
            base_dir: overrides
                .base_dir
                .or_else(|| self.store.base_dir.clone())
                .unwrap_or_else(|| default_base_dir(cwd)),
        }
    }
}

/// `<cwd>/.workdir/mnt`
pub fn default_base_dir(cwd: &Path) -> PathBuf {
    cwd.join(".workdir").join("mnt")
}

/// Get the config directory path (~/.shardstore/)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".shardstore"))
}

/// Get the config file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration from file
/// Falls back to defaults if file doesn't exist
pub fn load_config() -> ShardStoreConfig {
    match config_file_path() {
        Ok(path) if path.exists() => load_config_from(&path),
        _ => ShardStoreConfig::default(),
    }
}

/// Load configuration from a specific file, warning and falling back to
/// defaults when it cannot be read or parsed
pub fn load_config_from(path: &Path) -> ShardStoreConfig {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config file, using defaults");
                ShardStoreConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
            ShardStoreConfig::default()
        }
    }
}

/// Save configuration to file
pub fn save_config(config: &ShardStoreConfig) -> Result<PathBuf> {
    let path = config_file_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration to a specific file, creating its directory
pub fn save_config_to(config: &ShardStoreConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}
