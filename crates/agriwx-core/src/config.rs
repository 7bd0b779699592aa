use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// CWA open data endpoint for the weekly agricultural forecast (F-A0010-001).
pub const DEFAULT_ENDPOINT: &str = "https://opendata.cwa.gov.tw/fileapi/v1/opendataapi/F-A0010-001";

const APP_DIR_NAME: &str = "agriwx";
const DB_FILE_NAME: &str = "sqlitedata.db";
const API_KEY_ENV: &str = "CWA_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a one-line summary of all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml
    pub config_dir: PathBuf,

    /// Upstream forecast feed
    pub api: ApiConfig,

    /// Local forecast store
    pub storage: StorageConfig,

    /// Dashboard preferences
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Forecast endpoint URL
    pub endpoint: String,

    /// CWA authorization key. Left out of the file by default; see [`ApiConfig::api_key`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Local JSON copy of the feed, read when the HTTP call fails.
    ///
    /// Unset by default: a failed fetch fails the run.
    #[serde(default)]
    pub fallback_file: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    /// The authorization key to send: the configured value, else `$CWA_API_KEY`.
    ///
    /// Read at use time so the environment is never persisted to config.toml.
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(self.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
    }
}

fn resolve_api_key(configured: Option<&str>, env: Option<String>) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            fallback_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the `forecasts` table
    pub db_path: PathBuf,

    /// Prune rows whose forecast date is older than this many days.
    /// Unset keeps rows indefinitely.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(DB_FILE_NAME)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Region selected when none is given on the command line
    #[serde(default = "default_preferred_region")]
    pub preferred_region: String,
}

fn default_preferred_region() -> String {
    "北部地區".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            preferred_region: default_preferred_region(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            config_dir,
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default file if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors abort.
    pub fn load_validated() -> std::result::Result<Self, ConfigError> {
        let config = Self::load().map_err(|e| ConfigError::ParseError(format!("{:#}", e)))?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.endpoint, "api.endpoint", &mut result);

        if self.api.api_key().is_none() {
            result.add_warning(
                "api.api_key",
                format!("No authorization key set (config or ${})", API_KEY_ENV),
            );
        }

        if self.api.timeout_secs == 0 {
            result.add_error("api.timeout_secs", "Timeout must be greater than 0");
        } else if self.api.timeout_secs > 600 {
            result.add_warning("api.timeout_secs", "Timeout is unusually long (>10 minutes)");
        }

        if let Some(fallback) = &self.api.fallback_file {
            if !fallback.exists() {
                result.add_warning(
                    "api.fallback_file",
                    format!("Fallback file does not exist: {}", fallback.display()),
                );
            }
        }

        if self.storage.db_path.as_os_str().is_empty() {
            result.add_error("storage.db_path", "Store path must not be empty");
        } else if self.storage.db_path.is_dir() {
            result.add_error(
                "storage.db_path",
                format!(
                    "Store path is a directory: {}",
                    self.storage.db_path.display()
                ),
            );
        }

        if self.storage.retention_days == Some(0) {
            result.add_warning(
                "storage.retention_days",
                "Retention of 0 days prunes every forecast older than today",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
