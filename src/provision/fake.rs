//! In-memory provider for orchestrator tests

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use serde_json::{json, Value};

use super::input::SiteRequest;
use super::orchestrator::Sleeper;
use super::provider::Provider;
use crate::domain::{CliError, ProvisioningJob};

/// App-setup response with the given status, optionally with a build
pub fn job(status: &str, with_build: bool) -> Value {
    let failure = (status == "failed").then_some("build failed");
    let mut value = json!({
        "id": "setup-1",
        "status": status,
        "app": {"id": "app-1", "name": "my-ci"},
        "failure_message": failure,
    });
    if with_build {
        value["build"] = json!({
            "id": "build-1",
            "output_stream_url": "https://build-output.example.com/streams/1",
        });
    }
    value
}

/// Replays scripted polls and command outputs, recording every call
#[derive(Default)]
pub struct FakeProvider {
    polls: RefCell<VecDeque<Value>>,
    outputs: RefCell<VecDeque<String>>,
    fail_poll_after: Option<usize>,
    fail_stream: bool,
    calls: RefCell<Vec<String>>,
    commands: RefCell<Vec<(String, BTreeMap<String, String>)>>,
}

impl FakeProvider {
    pub fn new(polls: Vec<Value>) -> Self {
        Self {
            polls: RefCell::new(polls.into()),
            ..Default::default()
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = RefCell::new(outputs.into());
        self
    }

    /// Answers 500 once `n` polls have succeeded
    pub fn failing_poll_after(mut self, n: usize) -> Self {
        self.fail_poll_after = Some(n);
        self
    }

    pub fn failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn commands(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.commands.borrow().clone()
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }
}

impl Provider for FakeProvider {
    fn create_app_setup(&self, _request: &SiteRequest) -> Result<ProvisioningJob, CliError> {
        self.record("create_app_setup");
        ProvisioningJob::from_value(json!({"id": "setup-1", "status": "pending"}))
    }

    fn app_setup(&self, _id: &str) -> Result<ProvisioningJob, CliError> {
        if Some(self.count("app_setup")) == self.fail_poll_after {
            return Err(CliError::remote(500, "internal error"));
        }
        self.record("app_setup");
        let next = self
            .polls
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CliError::remote(404, "no scripted poll left"))?;
        ProvisioningJob::from_value(next)
    }

    fn build(&self, _app_id: Option<&str>, build_id: &str) -> Result<Value, CliError> {
        self.record("build");
        Ok(json!({"id": build_id, "status": "failed"}))
    }

    fn stream_output(&self, _url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), CliError> {
        self.record("stream");
        if self.fail_stream {
            return Err(CliError::network(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )));
        }
        sink(b"-----> Building\n");
        Ok(())
    }

    fn run_command(
        &self,
        _app_id: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<String, CliError> {
        self.record("run_command");
        self.commands
            .borrow_mut()
            .push((command.to_string(), env.clone()));
        Ok(self.outputs.borrow_mut().pop_front().unwrap_or_default())
    }
}

/// Records requested sleeps without waiting
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}
