//! Domain models for the MetaCI CLI
//!
//! Contains the validation rules and state transitions without any I/O.

mod error;
mod plan;
mod provisioning;
mod service;

pub use error::CliError;
pub use plan::{split_flows, Plan, PlanDraft, PlanRequest, TriggerType};
pub use provisioning::{
    next_step, parse_admin_token, site_url, webhook_url, AppShape, JobApp, JobBuild, JobStatus,
    ProvisioningJob, Step,
};
pub use service::{
    ConnectedApp, GithubService, ServiceConfig, ServiceCredential, GITHUB_SERVICE, SITE_SERVICE,
};
