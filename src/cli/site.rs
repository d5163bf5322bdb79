//! Site CLI commands

use anyhow::{bail, Context as _, Result};
use clap::Subcommand;
use serde_json::{Map, Value};

use super::app::AppContext;
use super::output::Output;
use crate::domain::{AppShape, ServiceCredential, SITE_SERVICE};
use crate::prompt::{Prompter, Step, TerminalPrompter};
use crate::provision::{
    collect_site_input, HerokuClient, HerokuSettings, InputDefaults, LocalTools, Orchestrator,
    Provider, SiteOptions, SiteRequest, SystemTools,
};
use crate::storage::{require_site, site_credential, Keychain, Project};

#[derive(Subcommand)]
pub enum SiteCommands {
    /// Deploy a new Heroku app running MetaCI
    Create {
        /// App name instead of prompting for it
        #[arg(long)]
        name: Option<String>,

        /// App shape instead of prompting for it
        #[arg(long, value_enum)]
        shape: Option<AppShape>,
    },

    /// Connect to an existing MetaCI site
    Connect,

    /// Open the current site in a browser
    Browser,

    /// Show the current site connection
    Info {
        /// Print the API token in full
        #[arg(long)]
        show_token: bool,
    },
}

pub fn run(cmd: SiteCommands, ctx: &AppContext) -> Result<()> {
    let prompter = TerminalPrompter::new();
    match cmd {
        SiteCommands::Create { name, shape } => {
            Project::open_current()?;

            let defaults = InputDefaults {
                app_domain: ctx.config.global.app_domain.clone(),
                private_key: ctx.config.default_private_key(),
            };
            let settings = HerokuSettings {
                api_url: ctx.config.global.heroku_api_url.clone(),
                source_blob_url: ctx.config.global.source_blob_url.clone(),
                timeout: ctx.config.http_timeout(),
            };
            let site = SiteSetup {
                keychain: &ctx.keychain,
                prompter: &prompter,
                tools: &SystemTools,
                output: &ctx.output,
                defaults,
            };
            let heroku = |request: &SiteRequest| -> Result<Box<dyn Provider>> {
                Ok(Box::new(HerokuClient::new(&settings, &request.provider_token)?))
            };
            site.create(SiteOptions { name, shape }, heroku, ctx.config.poll_interval())?;
            Ok(())
        }
        SiteCommands::Connect => {
            connect_site(&ctx.keychain, &prompter, &ctx.output)?;
            Ok(())
        }
        SiteCommands::Browser => browser(ctx),
        SiteCommands::Info { show_token } => info(ctx, show_token),
    }
}

/// Asks before replacing an existing connection; declining aborts
pub fn verify_overwrite(
    keychain: &dyn Keychain,
    prompter: &dyn Prompter,
    output: &Output,
) -> Result<()> {
    let Some(current) = site_credential(keychain)? else {
        return Ok(());
    };

    output.warn(&format!(
        "Site {} is currently configured. Connecting to a new site replaces the local configuration for it. You can always use 'metaci site connect' to reconnect.",
        current.url
    ));
    if !prompter.confirm("Are you sure you want to connect to a new site?", false)? {
        bail!("Aborted, still connected to {}", current.url);
    }
    Ok(())
}

/// Prompts for a site URL and token and stores them
pub fn connect_site(
    keychain: &dyn Keychain,
    prompter: &dyn Prompter,
    output: &Output,
) -> Result<ServiceCredential> {
    verify_overwrite(keychain, prompter, output)?;

    let url = Step::new("site url", "Site Base URL").ask(prompter)?;
    prompter.section(
        "API Token",
        "Contact your MetaCI administrator to get an API Token. Administrators create tokens in the admin panel under Auth Tokens.\nYour input will be hidden.",
    );
    let token = Step::new("api token", "API Token").hidden().ask(prompter)?;

    let credential = ServiceCredential::new(url.trim_end_matches('/'), token);
    keychain
        .set_service(SITE_SERVICE, &credential.to_config())
        .context("Failed to store the site connection")?;

    output.success(&format!("Connected to {}", credential.url));
    Ok(credential)
}

/// Collaborators for `site create`
pub struct SiteSetup<'a> {
    pub keychain: &'a dyn Keychain,
    pub prompter: &'a dyn Prompter,
    pub tools: &'a dyn LocalTools,
    pub output: &'a Output,
    pub defaults: InputDefaults,
}

impl SiteSetup<'_> {
    /// Collects input, provisions the app, and connects to it
    ///
    /// `make_provider` is only called once every input is valid.
    pub fn create<F>(
        &self,
        options: SiteOptions,
        make_provider: F,
        poll_interval: std::time::Duration,
    ) -> Result<ServiceCredential>
    where
        F: FnOnce(&SiteRequest) -> Result<Box<dyn Provider>>,
    {
        verify_overwrite(self.keychain, self.prompter, self.output)?;

        let request = collect_site_input(
            self.prompter,
            self.keychain,
            self.tools,
            options,
            &self.defaults,
        )?;
        let provider = make_provider(&request)?;

        Orchestrator::new(provider.as_ref(), self.prompter, self.keychain, self.output)
            .with_poll_interval(poll_interval)
            .run(&request)
    }
}

fn browser(ctx: &AppContext) -> Result<()> {
    let site = require_site(&ctx.keychain)?;
    ctx.output.status(&format!("Opening browser to {}", site.url));
    open::that(&site.url).with_context(|| format!("Failed to open {}", site.url))?;
    Ok(())
}

fn info(ctx: &AppContext, show_token: bool) -> Result<()> {
    let site = require_site(&ctx.keychain)?;
    ctx.output.render(&describe(&site, show_token));
    Ok(())
}

fn describe(site: &ServiceCredential, show_token: bool) -> Value {
    let token = if show_token {
        site.token.clone()
    } else {
        site.masked_token()
    };

    let mut map = Map::new();
    map.insert("url".into(), Value::from(site.url.clone()));
    map.insert("token".into(), Value::from(token));
    for (key, value) in &site.extra {
        map.insert(key.clone(), Value::from(value.clone()));
    }
    Value::Object(map)
}
