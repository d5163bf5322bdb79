//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{plan, site};
use crate::storage::{Config, FileKeychain};

#[derive(Parser)]
#[command(name = "metaci")]
#[command(author, version, about = "Command line interface for MetaCI")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding config.toml and keychain.toml
    #[arg(long, global = true, env = "METACI_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage build plans
    #[command(subcommand)]
    Plan(plan::PlanCommands),

    /// Manage the MetaCI site connection
    #[command(subcommand)]
    Site(site::SiteCommands),
}

/// Settings and storage shared by every command
pub struct AppContext {
    pub config: Config,
    pub keychain: FileKeychain,
    pub output: Output,
}

impl AppContext {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config_dir.as_deref())?;
        let keychain = FileKeychain::new(config.keychain_path());
        debug!(config_dir = %config.config_dir.display(), "loaded configuration");

        Ok(Self {
            config,
            keychain,
            output: Output::new(cli.format),
        })
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "metaci_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("metaci starting");

    let ctx = AppContext::load(&cli)?;
    match cli.command {
        Commands::Plan(cmd) => plan::run(cmd, &ctx)?,
        Commands::Site(cmd) => site::run(cmd, &ctx)?,
    }

    debug!("command completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_site_create_flags() {
        let cli = Cli::try_parse_from(["metaci", "site", "create", "--name", "ci", "--shape", "prod"])
            .unwrap();
        match cli.command {
            Commands::Site(site::SiteCommands::Create { name, shape }) => {
                assert_eq!(name.as_deref(), Some("ci"));
                assert_eq!(shape, Some(crate::domain::AppShape::Prod));
            }
            _ => panic!("expected site create"),
        }
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(Cli::try_parse_from(["metaci", "site", "create", "--shape", "huge"]).is_err());
    }

    #[test]
    fn parses_plan_list_repo() {
        let cli = Cli::try_parse_from(["metaci", "--format", "json", "plan", "list", "--repo", "Owner/Name"])
            .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Plan(plan::PlanCommands::List { repo }) => {
                assert_eq!(repo.unwrap().to_string(), "Owner/Name");
            }
            _ => panic!("expected plan list"),
        }
    }
}
