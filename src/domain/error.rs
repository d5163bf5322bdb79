//! Failure taxonomy shared by every command
//!
//! Nothing in the crate retries on any of these. They all travel up to the
//! command boundary and abort the current command.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad or missing local input
    #[error("Invalid {step}: {reason}")]
    Validation { step: String, reason: String },

    /// No site is configured
    #[error("{0}")]
    Authentication(String),

    /// A remote endpoint answered with a non-success status
    #[error("Remote request failed with status {status}: {body}")]
    Remote { status: u16, body: String },

    /// Transport-level failure (timeout, DNS, connection refused, dropped socket)
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for CliError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(Box::new(err))
    }
}

impl CliError {
    pub fn validation(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status,
            body: body.into(),
        }
    }

    /// Wraps a socket or TLS failure
    pub fn network<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network(Box::new(err))
    }

    pub fn no_site() -> Self {
        Self::Authentication(
            "No site is currently connected. Use 'metaci site connect' or 'metaci site create' to connect to a site"
                .to_string(),
        )
    }

    /// Returns the failing step name for validation errors
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Validation { step, .. } => Some(step),
            _ => None,
        }
    }
}
