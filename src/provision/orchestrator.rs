//! Site creation state machine
//!
//! Submits the app-setup job, polls it to a terminal status, then bootstraps
//! the new site and stores its credential. [`next_step`] decides every
//! transition; this module only performs the I/O around it.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use indicatif::ProgressBar;
use thiserror::Error;
use tracing::debug;

use super::input::SiteRequest;
use super::provider::Provider;
use crate::cli::Output;
use crate::domain::{
    next_step, parse_admin_token, AppShape, CliError, ProvisioningJob, ServiceCredential, Step,
    SITE_SERVICE,
};
use crate::prompt::{Constraint, Prompter};
use crate::storage::Keychain;

const PROGRESS_LEN: u64 = 100;
const PROGRESS_CAP: u64 = 98;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Site provisioning failed: {message}")]
    Failed { message: String },

    #[error(
        "The site at {site_url} was created but no API token was found. Run 'metaci site connect' to connect to it manually"
    )]
    TokenNotFound { site_url: String },

    #[error("Provisioning succeeded but the response did not identify the new app")]
    NoApp,
}

/// Waits between polls
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Drives one site creation from submission to a stored credential
pub struct Orchestrator<'a> {
    provider: &'a dyn Provider,
    prompter: &'a dyn Prompter,
    keychain: &'a dyn Keychain,
    output: &'a Output,
    sleeper: &'a dyn Sleeper,
    poll_interval: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        prompter: &'a dyn Prompter,
        keychain: &'a dyn Keychain,
        output: &'a Output,
    ) -> Self {
        Self {
            provider,
            prompter,
            keychain,
            output,
            sleeper: &ThreadSleeper,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the whole workflow and returns the stored credential
    pub fn run(&self, request: &SiteRequest) -> Result<ServiceCredential> {
        self.output
            .status(&format!("Creating app {} ({} shape)", request.app_name, request.shape));
        let job = self.provider.create_app_setup(request)?;
        debug!(setup = %job.id, "app setup submitted");

        let job = self.poll(&job.id)?;
        match next_step(&job.status) {
            Step::Diagnose => return Err(self.diagnose(&job).into()),
            Step::Abort => {
                return Err(CliError::remote(
                    200,
                    format!("Received an unknown status '{}' from Heroku: {}", job.status, job.raw),
                )
                .into())
            }
            _ => {}
        }

        self.output.success(&format!("App {} is provisioned", request.app_name));
        let app_id = job.app.as_ref().map(|app| app.id.clone()).ok_or(ProvisionError::NoApp)?;

        self.customize_shape(request.shape);
        self.bootstrap(&app_id, request)
    }

    /// Polls until the job leaves `pending`
    fn poll(&self, setup_id: &str) -> Result<ProvisioningJob, CliError> {
        let bar = self.output.progress_bar(PROGRESS_LEN, "Provisioning");
        let mut streamed = false;

        loop {
            let job = match self.provider.app_setup(setup_id) {
                Ok(job) => job,
                Err(e) => {
                    bar.abandon();
                    return Err(e);
                }
            };
            debug!(status = %job.status, "polled app setup");

            if !streamed {
                if let Some(url) = job.build.as_ref().and_then(|b| b.output_stream_url.clone()) {
                    streamed = true;
                    self.stream_build(&bar, &url);
                }
            }

            if next_step(&job.status) != Step::Poll {
                bar.set_position(PROGRESS_LEN);
                bar.finish();
                return Ok(job);
            }

            if bar.position() < PROGRESS_CAP {
                bar.inc(1);
            }
            self.sleeper.sleep(self.poll_interval);
        }
    }

    fn stream_build(&self, bar: &ProgressBar, url: &str) {
        let result = bar.suspend(|| {
            self.provider
                .stream_output(url, &mut |chunk: &[u8]| self.output.raw(chunk))
        });
        if let Err(e) = result {
            self.output.warn(&format!("Build log stream interrupted: {}", e));
        }
    }

    fn diagnose(&self, job: &ProvisioningJob) -> ProvisionError {
        self.output.error("Provisioning failed");
        self.output.render(&job.raw);

        match &job.build {
            Some(build) => {
                let app_id = job.app.as_ref().map(|app| app.id.as_str());
                match self.provider.build(app_id, &build.id) {
                    Ok(detail) => {
                        self.output.status("Build detail:");
                        self.output.render(&detail);
                    }
                    Err(e) => self.output.warn(&format!("Could not fetch build detail: {}", e)),
                }
            }
            None => self.output.warn("No build was started for this app"),
        }

        ProvisionError::Failed {
            message: job
                .failure_message
                .clone()
                .unwrap_or_else(|| "no failure message was reported".to_string()),
        }
    }

    fn customize_shape(&self, shape: AppShape) {
        match shape {
            AppShape::Dev => {}
            AppShape::Staging | AppShape::Prod => {
                debug!(%shape, "no post-provisioning changes for this shape");
            }
        }
    }

    fn bootstrap(&self, app_id: &str, request: &SiteRequest) -> Result<ServiceCredential> {
        self.prompter.section(
            "Admin User",
            "Choose a password for the site's admin user. Your input will be hidden.",
        );
        let raw = self.prompter.prompt_hidden_confirmed("Admin Password")?;
        let password = Constraint::NonEmpty.check("admin password", &raw)?;

        self.output.status("Creating the admin user");
        let mut env = BTreeMap::new();
        env.insert("ADMINUSER_PASS".to_string(), password);
        let output = self.provider.run_command(
            app_id,
            &format!("python manage.py autoadminuser {}", request.from_email()),
            &env,
        )?;
        if let Some(last) = output.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
            self.output.line(last);
        }

        self.output.status("Fetching the admin API token");
        let output = self
            .provider
            .run_command(app_id, "python manage.py usertoken admin", &BTreeMap::new())?;
        let token = parse_admin_token(&output).ok_or_else(|| ProvisionError::TokenNotFound {
            site_url: request.site_url.clone(),
        })?;

        let credential = ServiceCredential::new(request.site_url.clone(), token);
        self.keychain.set_service(SITE_SERVICE, &credential.to_config())?;
        self.output
            .success(&format!("Connected to {}", credential.url));
        Ok(credential)
    }
}
