//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Plan | Build plans on the site | `plan create`, `plan list --repo Owner/Name` |
//! | Site | Site connection and provisioning | `site create`, `site connect`, `site info` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr. `RUST_LOG` takes
//! precedence when set:
//! ```bash
//! metaci --verbose plan list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod plan;
mod site;

pub use app::{run, AppContext, Cli, Commands};
pub use output::{render_recursive, Output, OutputFormat};
pub use plan::{create_plan, lookup_repo, PlanCommands};
pub use site::{connect_site, verify_overwrite, SiteCommands, SiteSetup};
