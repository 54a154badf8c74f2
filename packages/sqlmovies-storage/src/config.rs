//! Store configuration (YAML/Env loading)
//!
//! ```yaml
//! version: 1
//! snapshot_dir: db
//! extension: db
//! busy_timeout_ms: 5000
//! foreign_keys: true
//! ```
//!
//! Environment overrides are applied on top of whatever was loaded:
//! `SQLMOVIES_SNAPSHOT_DIR` and `SQLMOVIES_BUSY_TIMEOUT_MS`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, StorageError};

pub const SNAPSHOT_DIR_ENV: &str = "SQLMOVIES_SNAPSHOT_DIR";
pub const BUSY_TIMEOUT_ENV: &str = "SQLMOVIES_BUSY_TIMEOUT_MS";

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Where snapshots live and how their connections are opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one database file per stage
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// File extension of snapshot files, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How long SQLite waits on a locked file before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enforce `REFERENCES` clauses on every connection
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigExportV1 {
    version: u32,
    #[serde(default = "default_snapshot_dir")]
    snapshot_dir: PathBuf,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    foreign_keys: bool,
}

impl From<ConfigExportV1> for StoreConfig {
    fn from(export: ConfigExportV1) -> Self {
        Self {
            snapshot_dir: export.snapshot_dir,
            extension: export.extension,
            busy_timeout_ms: export.busy_timeout_ms,
            foreign_keys: export.foreign_keys,
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_extension() -> String {
    "db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_foreign_keys() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            extension: default_extension(),
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `dir` with default connection settings
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::default().snapshot_dir(dir)
    }

    pub fn snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn busy_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load a versioned YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        let version = raw
            .get("version")
            .ok_or_else(|| {
                StorageError::config(
                    "Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.",
                )
            })?
            .as_u64()
            .ok_or_else(|| StorageError::config("'version' must be an integer"))?;

        let supported = u32::try_from(version).map_or(false, |v| SUPPORTED_VERSIONS.contains(&v));
        if !supported {
            return Err(StorageError::config(format!(
                "Unsupported configuration version {}. Supported versions: 1",
                version
            )));
        }

        let export: ConfigExportV1 = serde_yaml::from_value(raw)?;
        let config = StoreConfig::from(export);
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        let export = ConfigExportV1 {
            version: 1,
            snapshot_dir: self.snapshot_dir.clone(),
            extension: self.extension.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            foreign_keys: self.foreign_keys,
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    /// Apply `SQLMOVIES_*` environment variables
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `SQLMOVIES_*` variable names
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(SNAPSHOT_DIR_ENV) {
            self.snapshot_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup(BUSY_TIMEOUT_ENV) {
            self.busy_timeout_ms = ms.trim().parse().map_err(|_| {
                StorageError::config(format!("{} must be a number of milliseconds, got '{}'", BUSY_TIMEOUT_ENV, ms))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() || !self.extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::config(format!(
                "Invalid snapshot extension '{}': use letters and digits only, e.g. 'db'",
                self.extension
            )));
        }
        if self.busy_timeout_ms == 0 {
            return Err(StorageError::config("busy_timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}
