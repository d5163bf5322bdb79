//! # Interactive Prompts
//!
//! Commands gather their parameters through a [`Prompter`] so the same
//! sequence runs against a terminal ([`TerminalPrompter`]) or, in tests, a
//! script of canned answers (`ScriptedPrompter`).
//!
//! A sequence is a list of [`Step`]s. A step can be asked unconditionally
//! ([`Step::ask`]), only when an earlier answer calls for it
//! ([`Step::ask_if`]), or skipped in favour of a command-line flag
//! ([`Step::ask_or`]). Every answer is checked against the step's
//! [`Constraint`]; the first violation aborts the whole sequence with a
//! validation error before anything is sent anywhere.

#[cfg(test)]
mod scripted;
mod step;
mod terminal;

#[cfg(test)]
pub use scripted::{Answer, ScriptedPrompter};
pub use step::{Constraint, Step};
pub use terminal::TerminalPrompter;

use crate::domain::CliError;

/// Input capability used by interactive commands
pub trait Prompter {
    /// Shows a section heading and help text ahead of the next prompts
    fn section(&self, title: &str, help: &str);

    /// Reads a line; an empty answer yields `default` when one is given
    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String, CliError>;

    /// Reads a line without echoing it
    fn prompt_hidden(&self, label: &str) -> Result<String, CliError>;

    /// Reads a hidden value twice and requires both entries to match
    fn prompt_hidden_confirmed(&self, label: &str) -> Result<String, CliError>;

    /// Asks a yes/no question
    fn confirm(&self, label: &str, default: bool) -> Result<bool, CliError>;
}
