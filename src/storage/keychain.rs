//! Keychain for named service credentials
//!
//! Services are stored in `{config_dir}/keychain.toml`:
//!
//! ```toml
//! [services.metaci]
//! url = "https://my-ci.herokuapp.com"
//! token = "..."
//!
//! [services.github]
//! username = "octocat"
//! password = "..."
//! email = "octocat@example.com"
//!
//! [connected_app]
//! callback_url = "http://localhost:8080/callback"
//! client_id = "..."
//! client_secret = "..."
//! ```
//!
//! Writes take an exclusive lock on a sidecar `.lock` file and replace the
//! keychain through a temp file + rename.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CliError, ConnectedApp, ServiceConfig, ServiceCredential, SITE_SERVICE};

#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse keychain {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize keychain: {0}")]
    Serialize(String),
}

/// Named credential storage
pub trait Keychain {
    /// Returns a service record, or `None` if it was never configured
    fn get_service(&self, name: &str) -> Result<Option<ServiceConfig>, KeychainError>;

    /// Stores a service record, replacing any existing one
    fn set_service(&self, name: &str, service: &ServiceConfig) -> Result<(), KeychainError>;

    /// Returns the Salesforce connected app record
    fn get_connected_app(&self) -> Result<Option<ConnectedApp>, KeychainError>;
}

/// Reads the site connection, if one is configured
pub fn site_credential(keychain: &dyn Keychain) -> anyhow::Result<Option<ServiceCredential>> {
    match keychain.get_service(SITE_SERVICE)? {
        Some(config) => Ok(Some(ServiceCredential::from_config(&config)?)),
        None => Ok(None),
    }
}

/// Reads the site connection or fails with connect/create guidance
pub fn require_site(keychain: &dyn Keychain) -> anyhow::Result<ServiceCredential> {
    site_credential(keychain)?.ok_or_else(|| CliError::no_site().into())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeychainFile {
    #[serde(default)]
    services: BTreeMap<String, ServiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connected_app: Option<ConnectedApp>,
}

/// Keychain backed by a TOML file
pub struct FileKeychain {
    path: PathBuf,
}

impl FileKeychain {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> KeychainError {
        KeychainError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<KeychainFile, KeychainError> {
        if !self.path.exists() {
            return Ok(KeychainFile::default());
        }

        let file = File::open(&self.path).map_err(|e| self.io_err(e))?;
        file.lock_shared().map_err(|e| self.io_err(e))?;
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;

        toml::from_str(&content).map_err(|e| KeychainError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn lock_for_write(&self) -> Result<File, KeychainError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let lock_path = self.path.with_extension("toml.lock");
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| self.io_err(e))?;
        lock.lock_exclusive().map_err(|e| self.io_err(e))?;
        Ok(lock)
    }

    fn write(&self, data: &KeychainFile) -> Result<(), KeychainError> {
        let content =
            toml::to_string_pretty(data).map_err(|e| KeychainError::Serialize(e.to_string()))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }

            let mut file = options.open(&temp_path).map_err(|e| self.io_err(e))?;
            file.write_all(content.as_bytes()).map_err(|e| self.io_err(e))?;
            file.flush().map_err(|e| self.io_err(e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| self.io_err(e))
    }
}

impl Keychain for FileKeychain {
    fn get_service(&self, name: &str) -> Result<Option<ServiceConfig>, KeychainError> {
        Ok(self.read()?.services.remove(name))
    }

    fn set_service(&self, name: &str, service: &ServiceConfig) -> Result<(), KeychainError> {
        // Held until the rename lands
        let _lock = self.lock_for_write()?;

        let mut data = self.read()?;
        data.services.insert(name.to_string(), service.clone());
        self.write(&data)?;

        tracing::debug!(service = name, path = %self.path.display(), "stored service");
        Ok(())
    }

    fn get_connected_app(&self) -> Result<Option<ConnectedApp>, KeychainError> {
        Ok(self.read()?.connected_app)
    }
}

/// In-memory keychain for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryKeychain {
    services: Mutex<BTreeMap<String, ServiceConfig>>,
    connected_app: Option<ConnectedApp>,
}

#[cfg(test)]
impl MemoryKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, name: &str, service: ServiceConfig) -> Self {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), service);
        self
    }

    pub fn with_connected_app(mut self, app: ConnectedApp) -> Self {
        self.connected_app = Some(app);
        self
    }
}

#[cfg(test)]
impl Keychain for MemoryKeychain {
    fn get_service(&self, name: &str) -> Result<Option<ServiceConfig>, KeychainError> {
        let services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        Ok(services.get(name).cloned())
    }

    fn set_service(&self, name: &str, service: &ServiceConfig) -> Result<(), KeychainError> {
        let mut services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        services.insert(name.to_string(), service.clone());
        Ok(())
    }

    fn get_connected_app(&self) -> Result<Option<ConnectedApp>, KeychainError> {
        Ok(self.connected_app.clone())
    }
}
