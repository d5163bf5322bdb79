//! Named service records held in the keychain
//!
//! The keychain stores every service as a flat string map. The typed views
//! below narrow a record to what a command needs and fail if a required key
//! is missing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::CliError;

/// Keychain name of the site connection
pub const SITE_SERVICE: &str = "metaci";

/// Keychain name of the GitHub credential
pub const GITHUB_SERVICE: &str = "github";

/// Raw service record: string keys to string values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceConfig(BTreeMap<String, String>);

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns a non-empty value or a validation error naming the service
    pub fn require(&self, service: &str, key: &str) -> Result<String, CliError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(CliError::validation(
                format!("{} service", service),
                format!("missing '{}'", key),
            )),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Connection to a site: base URL and API token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    pub url: String,
    pub token: String,
    pub extra: BTreeMap<String, String>,
}

impl ServiceCredential {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, CliError> {
        let url = config.require(SITE_SERVICE, "url")?;
        let token = config.require(SITE_SERVICE, "token")?;
        let extra = config
            .iter()
            .filter(|(k, _)| k.as_str() != "url" && k.as_str() != "token")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self { url, token, extra })
    }

    pub fn to_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::new()
            .with("url", self.url.clone())
            .with("token", self.token.clone());
        for (k, v) in &self.extra {
            config.0.insert(k.clone(), v.clone());
        }
        config
    }

    /// Token with everything but the last four characters hidden
    pub fn masked_token(&self) -> String {
        let count = self.token.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.token.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

/// GitHub account the site uses for API access and notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubService {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl GithubService {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CliError> {
        Ok(Self {
            username: config.require(GITHUB_SERVICE, "username")?,
            password: config.require(GITHUB_SERVICE, "password")?,
            email: config.require(GITHUB_SERVICE, "email")?,
        })
    }
}

/// Salesforce connected app used by the site for org authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedApp {
    pub callback_url: String,
    pub client_id: String,
    pub client_secret: String,
}
