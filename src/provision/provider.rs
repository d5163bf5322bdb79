//! Hosting provider interface used by the orchestrator

use std::collections::BTreeMap;

use serde_json::Value;

use super::input::SiteRequest;
use crate::domain::{CliError, ProvisioningJob};

/// Operations the site-creation workflow needs from the hosting provider
pub trait Provider {
    /// Submits the app-setup job
    fn create_app_setup(&self, request: &SiteRequest) -> Result<ProvisioningJob, CliError>;

    /// Fetches the current state of an app-setup job
    fn app_setup(&self, id: &str) -> Result<ProvisioningJob, CliError>;

    /// Fetches build detail for diagnostics
    fn build(&self, app_id: Option<&str>, build_id: &str) -> Result<Value, CliError>;

    /// Streams build output, handing each chunk to `sink` as it arrives
    fn stream_output(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), CliError>;

    /// Runs a one-off command on the app and returns its captured output
    fn run_command(
        &self,
        app_id: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<String, CliError>;
}

impl<T: Provider + ?Sized> Provider for &T {
    fn create_app_setup(&self, request: &SiteRequest) -> Result<ProvisioningJob, CliError> {
        (**self).create_app_setup(request)
    }

    fn app_setup(&self, id: &str) -> Result<ProvisioningJob, CliError> {
        (**self).app_setup(id)
    }

    fn build(&self, app_id: Option<&str>, build_id: &str) -> Result<Value, CliError> {
        (**self).build(app_id, build_id)
    }

    fn stream_output(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), CliError> {
        (**self).stream_output(url, sink)
    }

    fn run_command(
        &self,
        app_id: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<String, CliError> {
        (**self).run_command(app_id, command, env)
    }
}
