//! Site provisioning domain model
//!
//! Everything here is free of I/O. The orchestrator in `crate::provision`
//! drives the network calls and consults [`next_step`] after every poll.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CliError;

/// Provisioning preset for the hosted application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AppShape {
    /// Free resources, build concurrency of 1
    #[default]
    Dev,
    /// Paid resources, fixed build concurrency
    Staging,
    /// Paid resources, worker dynos autoscaled through Hirefire
    Prod,
}

impl AppShape {
    pub const CHOICES: [&'static str; 3] = ["dev", "staging", "prod"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppShape::Dev => "dev",
            AppShape::Staging => "staging",
            AppShape::Prod => "prod",
        }
    }

    /// Returns true if this shape scales workers through Hirefire
    pub fn needs_scaling_token(&self) -> bool {
        matches!(self, AppShape::Prod)
    }
}

impl fmt::Display for AppShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppShape {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dev" => Ok(AppShape::Dev),
            "staging" => Ok(AppShape::Staging),
            "prod" => Ok(AppShape::Prod),
            other => Err(CliError::validation(
                "app shape",
                format!("'{}' is not one of {}", other, Self::CHOICES.join(", ")),
            )),
        }
    }
}

/// Status of an app-setup job, as last reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => JobStatus::Pending,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("pending"),
            JobStatus::Succeeded => f.write_str("succeeded"),
            JobStatus::Failed => f.write_str("failed"),
            JobStatus::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Build attached to an app-setup job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobBuild {
    pub id: String,
    #[serde(default)]
    pub output_stream_url: Option<String>,
}

/// App created by an app-setup job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobApp {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Snapshot of an app-setup job
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningJob {
    pub id: String,
    pub status: JobStatus,
    pub build: Option<JobBuild>,
    pub app: Option<JobApp>,
    pub failure_message: Option<String>,
    /// Full response, kept for diagnostics
    pub raw: Value,
}

impl ProvisioningJob {
    /// Narrows an app-setup response into a job snapshot
    pub fn from_value(raw: Value) -> Result<Self, CliError> {
        #[derive(Deserialize)]
        struct Wire {
            id: String,
            status: String,
            #[serde(default)]
            build: Option<JobBuild>,
            #[serde(default)]
            app: Option<JobApp>,
            #[serde(default)]
            failure_message: Option<String>,
        }

        let wire: Wire = serde_json::from_value(raw.clone()).map_err(|e| {
            CliError::remote(200, format!("Unexpected app-setup response ({}): {}", e, raw))
        })?;

        Ok(Self {
            id: wire.id,
            status: JobStatus::parse(&wire.status),
            build: wire.build,
            app: wire.app,
            failure_message: wire.failure_message,
            raw,
        })
    }
}

/// What the orchestrator does after seeing a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep, then poll again
    Poll,
    /// Provisioning finished; bootstrap the app
    Bootstrap,
    /// Provisioning failed; fetch diagnostics and stop
    Diagnose,
    /// Unrecognized status; stop without guessing
    Abort,
}

/// Pure transition from the last polled status
pub fn next_step(status: &JobStatus) -> Step {
    match status {
        JobStatus::Pending => Step::Poll,
        JobStatus::Succeeded => Step::Bootstrap,
        JobStatus::Failed => Step::Diagnose,
        JobStatus::Unknown(_) => Step::Abort,
    }
}

/// Public URL of an app with the given name
pub fn site_url(app_name: &str, app_domain: &str) -> String {
    format!("https://{}.{}", app_name, app_domain)
}

/// GitHub webhook base for a site
pub fn webhook_url(site_url: &str) -> String {
    format!("{}/webhook/github", site_url.trim_end_matches('/'))
}

const TOKEN_PREFIX: &str = "Token: ";

/// Extracts the API token from `manage.py usertoken` output
pub fn parse_admin_token(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.trim_end_matches('\r').strip_prefix(TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .last()
        .map(String::from)
}
