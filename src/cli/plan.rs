//! Plan CLI commands

use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::{json, Value};

use super::app::AppContext;
use crate::api::{ApiClient, Params, SiteApi};
use crate::domain::{split_flows, CliError, Plan, PlanDraft, PlanRequest, TriggerType};
use crate::prompt::{Constraint, Prompter, Step, TerminalPrompter};
use crate::storage::{Project, RepoRef};

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a new plan to run builds on the site
    Create,

    /// List plans
    List {
        /// Repository in OwnerName/RepoName format
        #[arg(long)]
        repo: Option<RepoRef>,
    },
}

pub fn run(cmd: PlanCommands, ctx: &AppContext) -> Result<()> {
    match cmd {
        PlanCommands::Create => create(ctx),
        PlanCommands::List { repo } => list(ctx, repo),
    }
}

fn create(ctx: &AppContext) -> Result<()> {
    let project = Project::open_current()?;
    let api = ApiClient::from_keychain(&ctx.keychain, ctx.config.http_timeout())?;
    let repo = project.repo()?;
    let repo_id = lookup_repo(&api, &repo)?;

    let prompter = TerminalPrompter::new();
    let (request, created) = create_plan(&api, &prompter, project.flows(), repo_id)?;

    ctx.output.blank();
    ctx.output.success(&format!(
        "Created plan {} with the following configuration",
        request.name()
    ));
    ctx.output.render(&created);
    Ok(())
}

fn list(ctx: &AppContext, repo: Option<RepoRef>) -> Result<()> {
    let api = ApiClient::from_keychain(&ctx.keychain, ctx.config.http_timeout())?;

    // Outside a project, or without a remote, list every plan
    let repo = match repo {
        Some(repo) => Some(repo),
        None => Project::open_current().ok().and_then(|p| p.repo().ok()),
    };

    let mut params = Params::new();
    if let Some(repo) = repo {
        params.insert("repo".into(), json!(lookup_repo(&api, &repo)?));
    }

    let res = api.call("plans", "list", &params)?;
    let results = res.get("results").cloned().unwrap_or(Value::Array(Vec::new()));

    if ctx.output.is_json() {
        ctx.output.data(&results);
        return Ok(());
    }

    let plans: Vec<Plan> =
        serde_json::from_value(results).context("Unexpected plan list from the site")?;
    ctx.output.line(&format_row("#", "Name", "Org", "Flows", "Trigger", "Regex"));
    for plan in &plans {
        ctx.output.line(&format_row(
            &plan.id.to_string(),
            &plan.name,
            &plan.org,
            &plan.flows.join(","),
            plan.trigger_type.as_str(),
            plan.regex.as_deref().unwrap_or_default(),
        ));
    }
    Ok(())
}

fn format_row(id: &str, name: &str, org: &str, flows: &str, trigger: &str, regex: &str) -> String {
    format!(
        "{:<5} {:24.24} {:12.12} {:24.24} {:7.7} {}",
        id, name, org, flows, trigger, regex
    )
}

/// Resolves a repository to its id on the site
pub fn lookup_repo(api: &dyn SiteApi, repo: &RepoRef) -> Result<u64> {
    let mut params = Params::new();
    params.insert("owner".into(), json!(repo.owner));
    params.insert("name".into(), json!(repo.name));

    let res = api.call("repos", "list", &params)?;
    res.get("results")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("id"))
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            CliError::validation(
                "repository",
                format!("{} is not configured on the site", repo),
            )
            .into()
        })
}

fn org_names(api: &dyn SiteApi, repo_id: u64) -> Result<Vec<String>, CliError> {
    let mut params = Params::new();
    params.insert("repo".into(), json!(repo_id));

    let res = api.call("orgs", "list", &params)?;
    let mut names: Vec<String> = res
        .get("results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|org| org.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Runs the plan prompt sequence and submits the result
///
/// Every answer is validated as it is given; `plans/create` is only called
/// once the whole plan is valid.
pub fn create_plan(
    api: &dyn SiteApi,
    prompter: &dyn Prompter,
    flows: &[String],
    repo_id: u64,
) -> Result<(PlanRequest, Value)> {
    prompter.section(
        "Name and Description",
        "Provide a name and description of the build plan you are creating",
    );
    let name = Step::new("name", "Name").ask(prompter)?;
    let description = Step::new("description", "Description")
        .constraint(Constraint::Any)
        .ask(prompter)?;

    let orgs = org_names(api, repo_id)?;
    if orgs.is_empty() {
        return Err(CliError::validation(
            "org",
            "no orgs exist for this repository. Create one on the site first",
        )
        .into());
    }
    prompter.section(
        "Org",
        &format!(
            "Select the org this plan should run its builds against.\nValid org choices: {}",
            orgs.join(", ")
        ),
    );
    let org = Step::new("org", "Org")
        .constraint(Constraint::one_of(&orgs))
        .ask(prompter)?;

    prompter.section(
        "Flows",
        &format!(
            "What CumulusCI flows should this plan run? Separate multiple flows with commas.\nAvailable Flows: {}",
            flows.join(", ")
        ),
    );
    let flows = Step::new("flows", "Flow(s)")
        .constraint(Constraint::EachOf(flows.to_vec()))
        .ask(prompter)?;

    prompter.section(
        "Trigger Type",
        "How should this plan be triggered?\n  - commit: Trigger on branch commits matching a regex pattern\n  - tag: Trigger on new tags matching a regex pattern\n  - manual: Do not auto-trigger any builds. Can be manually triggered.",
    );
    let trigger_type: TriggerType = Step::new("trigger type", "Trigger Type (commit, tag, or manual)")
        .ask(prompter)?
        .parse()?;

    let regex_label = match trigger_type {
        TriggerType::Tag => "Tag Match RegEx (ex beta/.*)",
        _ => "Branch Match RegEx (ex feature/.*)",
    };
    let regex = Step::new("regex", regex_label).ask_if(prompter, trigger_type.needs_regex())?;

    prompter.section(
        "Github Commit Status",
        "The site can set the build status via the Github Commit Status API. Commit statuses are grouped by a context field.",
    );
    let context = if prompter.confirm("Set commit status in Github for this plan?", true)? {
        Some(
            Step::new("context", "Github Commit Status Context")
                .default_value(name.clone())
                .ask(prompter)?,
        )
    } else {
        None
    };

    let active = if trigger_type == TriggerType::Manual {
        true
    } else {
        let matching = regex
            .as_deref()
            .map(|r| format!(" matching regex {}", r))
            .unwrap_or_default();
        prompter.section(
            "Activate Plan",
            &format!(
                "If active, this plan will automatically build on new {}s{}",
                trigger_type, matching
            ),
        );
        prompter.confirm("Active?", true)?
    };

    prompter.section(
        "Public or Private",
        "Public plans and their builds are visible to anonymous users. Private plans are only visible to logged in staff users.",
    );
    let public = prompter.confirm("Public?", false)?;

    let request = PlanRequest::new(PlanDraft {
        name,
        description,
        org,
        flows: split_flows(&flows),
        trigger_type: Some(trigger_type),
        regex,
        context,
        active,
        public,
        repo_id,
    })?;

    let created = api.call("plans", "create", &request.to_params())?;
    Ok((request, created))
}
