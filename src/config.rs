//! Application settings.
//!
//! Settings resolve in three layers: built-in defaults, then the JSON file at
//! [`Settings::default_path`], then environment variables (`API_URL`, with
//! `APIDESK_API_URL` taking precedence over it).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::QueryConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_VARS: [&str; 2] = ["API_URL", "APIDESK_API_URL"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write settings to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no configuration directory on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the remote API.
    pub api_url: String,
    /// Token slot file. Defaults to the platform data directory.
    pub token_path: Option<PathBuf>,
    /// Log file. Logging is off when unset and `RUST_LOG` is not set.
    pub log_file: Option<PathBuf>,
    pub frame_rate: u32,
    /// Seconds before cached reads go stale on their own. Unset: only
    /// writes and explicit refreshes make data stale.
    pub stale_secs: Option<u64>,
    pub cache_secs: u64,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_path: None,
            log_file: None,
            frame_rate: 30,
            stale_secs: None,
            cache_secs: 5 * 60,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// `<config dir>/apidesk/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("apidesk").join("settings.json"))
    }

    /// Loads the settings file (if any) and applies the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides fields from environment variables looked up via `lookup`.
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in API_URL_VARS {
            if let Some(url) = lookup(name).filter(|v| !v.trim().is_empty()) {
                self.api_url = url.trim().to_string();
            }
        }
    }

    /// Writes the settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    /// Saves to [`Settings::default_path`].
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save), or [`ConfigError::NoConfigDir`].
    pub fn save_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)?;
        Ok(path)
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig::new(
            self.stale_secs.map_or(Duration::MAX, Duration::from_secs),
            Duration::from_secs(self.cache_secs),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
