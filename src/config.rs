//! Client configuration.
//!
//! Precedence: explicit overrides > environment > first config file found >
//! defaults. Config files are TOML:
//!
//! ```toml
//! uri = "file:///var/lib/multivarka"
//! collection = "users"
//!
//! [log]
//! level = "debug"
//! dir = "./logs"
//! retention = 7
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const DEFAULT_URI: &str = "memory://default";
pub const FILE_NAME: &str = "multivarka.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
    pub retention: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub uri: Option<String>,
    pub collection: Option<String>,
    pub log: LogConfig,
}

impl ClientConfig {
    /// Connection string, falling back to [`DEFAULT_URI`].
    #[must_use]
    pub fn uri(&self) -> &str {
        self.uri.as_deref().unwrap_or(DEFAULT_URI)
    }

    /// Fills unset fields from `other`.
    pub fn merge_missing(&mut self, other: Self) {
        if self.uri.is_none() {
            self.uri = other.uri;
        }
        if self.collection.is_none() {
            self.collection = other.collection;
        }
        if self.log.level.is_none() {
            self.log.level = other.log.level;
        }
        if self.log.dir.is_none() {
            self.log.dir = other.log.dir;
        }
        if self.log.retention.is_none() {
            self.log.retention = other.log.retention;
        }
    }

    /// Reads `MULTIVARKA_URI`, `MULTIVARKA_COLLECTION` and
    /// `MULTIVARKA_LOG_LEVEL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            uri: std::env::var("MULTIVARKA_URI").ok(),
            collection: std::env::var("MULTIVARKA_COLLECTION").ok(),
            log: LogConfig { level: std::env::var("MULTIVARKA_LOG_LEVEL").ok(), ..LogConfig::default() },
        }
    }

    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Ok(toml::from_str(&text)?)
    }

    /// Loads the layered configuration on top of `overrides`.
    ///
    /// # Errors
    /// An explicit path must exist and parse. Otherwise the first existing
    /// candidate file is used, and it must parse.
    pub fn load(overrides: Self, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = overrides;
        cfg.merge_missing(Self::from_env());
        let found = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => candidate_paths().into_iter().find(|p| p.exists()),
        };
        if let Some(path) = found {
            log::debug!("using config file {}", path.display());
            cfg.merge_missing(Self::from_file(&path)?);
        }
        Ok(cfg)
    }
}

/// Config file locations in lookup order.
#[must_use]
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(p) = std::env::var("MULTIVARKA_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(FILE_NAME));
    }
    paths
}
