// Configuration
// JSON settings file plus environment overrides

use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pager command line for help output, e.g. `less -R`
    pub pager: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

impl Config {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "sqlmeta", "sqlmeta").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the default location, then apply `PAGER`, `SQLMETA_LOG` and `SQLMETA_LOG_FILE`
    pub fn load() -> ConfigResult<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay environment values; empty values are ignored
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        if let Some(pager) = get("PAGER") {
            self.pager = Some(pager);
        }
        if let Some(level) = get("SQLMETA_LOG") {
            self.log_level = Some(level);
        }
        if let Some(file) = get("SQLMETA_LOG_FILE") {
            self.log_file = Some(file);
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            file: self.log_file.clone(),
        }
    }
}
