//! # Storage Layer
//!
//! Local state the CLI reads and writes.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Settings | TOML | `{config_dir}/config.toml` |
//! | Service credentials | TOML | `{config_dir}/keychain.toml` |
//! | Flow catalog | YAML (read only) | `{project}/cumulusci.yml` |
//!
//! ## Key Types
//!
//! - [`Config`] - User settings (API endpoints, poll interval)
//! - [`Keychain`] - Named service credentials, stored by [`FileKeychain`]
//!   (tests use an in-memory `MemoryKeychain`)
//! - [`Project`] - The CumulusCI project the command runs in

mod config;
mod keychain;
mod project;

pub use config::{expand_home, Config, ConfigError, GlobalConfig};
#[cfg(test)]
pub use keychain::MemoryKeychain;
pub use keychain::{require_site, site_credential, FileKeychain, Keychain, KeychainError};
pub use project::{Project, ProjectError, RepoRef};
