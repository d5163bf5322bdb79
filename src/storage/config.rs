//! Configuration handling for the MetaCI CLI
//!
//! Configuration is stored in `{config_dir}/config.toml`. The config dir
//! defaults to the platform config location (`~/.config/metaci-cli` on
//! Linux) and can be moved with `--config-dir` / `METACI_CONFIG_DIR`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Could not determine a config directory; pass --config-dir")]
    NoConfigDir,
}

/// User-level settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Base URL of the Heroku Platform API
    pub heroku_api_url: String,

    /// Tarball the new site is built from
    pub source_blob_url: String,

    /// Domain new apps are served under
    pub app_domain: String,

    /// Seconds between app-setup status polls
    pub poll_interval_secs: u64,

    /// Per-request timeout for API calls
    pub http_timeout_secs: u64,

    /// Default path offered for the Salesforce DX JWT private key
    pub default_private_key: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            heroku_api_url: "https://api.heroku.com".to_string(),
            source_blob_url:
                "https://github.com/SalesforceFoundation/mrbelvedereci/tarball/feature/api/"
                    .to_string(),
            app_domain: "herokuapp.com".to_string(),
            poll_interval_secs: 2,
            http_timeout_secs: 30,
            default_private_key: "~/.ssh/sfdx_server.key".to_string(),
        }
    }
}

/// Loaded configuration plus where it lives
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub config_dir: PathBuf,
}

impl Config {
    /// Loads configuration from `config_dir`, or the platform default
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_config_dir().ok_or(ConfigError::NoConfigDir)?,
        };

        let global = Self::load_global(&config_dir)?;
        Ok(Self { global, config_dir })
    }

    /// Returns the platform config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "metaci", "metaci-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global(config_dir: &Path) -> Result<GlobalConfig> {
        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse config")
    }

    /// Path of the keychain file
    pub fn keychain_path(&self) -> PathBuf {
        self.config_dir.join("keychain.toml")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.global.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.global.http_timeout_secs.max(1))
    }

    /// Default private key path with `~` expanded
    pub fn default_private_key(&self) -> PathBuf {
        expand_home(&self.global.default_private_key)
    }
}

/// Expands a leading `~/` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
