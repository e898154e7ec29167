//! Configuration loading from `~/.driftwatch/config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::DEFAULT_MAX_CONCURRENT_CHECKS;
use crate::validator::DEFAULT_DRIFT_THRESHOLD;

/// Default tenant timezone. The fiscal-year calendar this tool validates is
/// the Indian one, so the default zone follows.
pub const DEFAULT_TIMEZONE: chrono_tz::Tz = chrono_tz::Asia::Kolkata;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    HomeDirNotFound,

    #[error("Config file not found at {0}. Create it with: {{ \"dashboardBaseUrl\": \"https://crm.example.com\", \"databasePath\": \"/path/to/records.db\" }}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the CRM serving the dashboard aggregate endpoint.
    pub dashboard_base_url: String,

    /// Bearer token for the dashboard endpoint, when it requires one.
    #[serde(default)]
    pub api_token: Option<String>,

    /// SQLite system-of-record replica the backend counts run against.
    pub database_path: PathBuf,

    /// IANA timezone the reference instant is taken in.
    #[serde(default = "default_timezone_name")]
    pub timezone: String,

    /// Differences above this get the "large drift" warning.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: i64,

    /// Worker-pool bound for concurrent checks.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Per-call timeout for the dashboard endpoint.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timezone_name() -> String {
    DEFAULT_TIMEZONE.name().to_string()
}

fn default_drift_threshold() -> i64 {
    DEFAULT_DRIFT_THRESHOLD
}

fn default_max_concurrent_checks() -> usize {
    DEFAULT_MAX_CONCURRENT_CHECKS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Config {
    /// Load configuration from `~/.driftwatch/config.json`.
    pub fn load() -> Result<Config, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Self::load_from(&home.join(".driftwatch").join("config.json"))
    }

    /// Load configuration from an explicit path (CI, tests, `--config`).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Parse the configured timezone, warning and falling back to the
    /// default when it is not a known IANA name.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            log::warn!(
                "Unknown timezone '{}' in config, falling back to {}",
                self.timezone,
                DEFAULT_TIMEZONE.name()
            );
            DEFAULT_TIMEZONE
        })
    }
}
