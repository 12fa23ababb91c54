//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ROLLCALL_CONFIG";

/// Environment variable overriding `server_url`
pub const SERVER_URL_ENV_VAR: &str = "ROLLCALL_SERVER_URL";

/// How overlapping roster reloads are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Whichever response resolves last replaces the roster
    #[default]
    LastResolved,
    /// Responses from reloads older than the last applied one are dropped
    LatestIssued,
}

/// Dashboard configuration (TOML)
///
/// Every field has a default, so a partial or missing file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Origin of the attendance backend
    pub server_url: String,
    /// Where the bearer token is persisted between runs
    pub token_file: PathBuf,
    /// Default tracing directive
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub reload_policy: ReloadPolicy,
    /// Rows per page in the terminal roster view
    pub page_size: usize,
    /// Attendance percentage below which a student needs attention
    pub attention_threshold: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            token_file: default_data_dir().join("token"),
            log_level: "info".to_string(),
            request_timeout_secs: 30,
            reload_policy: ReloadPolicy::LastResolved,
            page_size: 25,
            attention_threshold: 75.0,
        }
    }
}

impl DashboardConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DashboardConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration following the resolution order:
    /// 1. Command-line argument (highest priority)
    /// 2. Environment variable
    /// 3. Platform config file
    /// 4. Compiled defaults (fallback)
    ///
    /// A missing file is not fatal: a warning is logged and defaults are used.
    /// A file that exists but does not parse is an error.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading configuration");
                Self::from_file(&path)?
            }
            Some(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV_VAR) {
            if !url.trim().is_empty() {
                config.server_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server_url must be an http(s) URL: {}",
                self.server_url
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if !(0.0..=100.0).contains(&self.attention_threshold) {
            return Err(Error::Config(format!(
                "attention_threshold must be between 0 and 100: {}",
                self.attention_threshold
            )));
        }
        Ok(())
    }
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config file (only if present)
    dirs::config_dir()
        .map(|d| d.join("rollcall").join("config.toml"))
        .filter(|p| p.exists())
}

/// Get OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rollcall"))
        .unwrap_or_else(|| PathBuf::from("./rollcall_data"))
}
