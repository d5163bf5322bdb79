//! MetaCI CLI - command line client for MetaCI continuous integration sites
//!
//! Manages build plans on a connected site and provisions new sites on
//! Heroku. Site credentials live in a local TOML keychain.

pub mod api;
pub mod cli;
pub mod domain;
pub mod prompt;
pub mod provision;
pub mod storage;

pub use domain::{CliError, Plan, PlanRequest, ServiceCredential, TriggerType};
