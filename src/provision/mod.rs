//! # Site Provisioning
//!
//! Creates a new MetaCI site on Heroku and connects the CLI to it.
//!
//! 1. [`collect_site_input`] gathers and validates every setting up front
//! 2. [`Orchestrator::run`] submits the app setup, polls it, streams the
//!    build log, and bootstraps the admin user once provisioning succeeds
//! 3. The admin API token is stored as the `metaci` service
//!
//! The remote side sits behind [`Provider`]; [`HerokuClient`] talks to the
//! Heroku Platform API.

#[cfg(test)]
mod fake;
mod heroku;
mod input;
mod orchestrator;
mod provider;
mod rendezvous;

pub use heroku::{HerokuClient, HerokuSettings};
pub use input::{
    collect_site_input, parse_devhub_username, InputDefaults, LocalTools, SiteOptions, SiteRequest,
    SystemTools,
};
pub use orchestrator::{Orchestrator, ProvisionError, Sleeper, ThreadSleeper};
pub use provider::Provider;
pub use rendezvous::{
    client_config, read_session, strip_handshake, webpki_config, RendezvousTarget,
};
