//! Prompt steps and their input constraints

use std::fs::File;

use super::Prompter;
use crate::domain::{split_flows, CliError};
use crate::storage::expand_home;

/// Rule an answer must satisfy
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Anything, including an empty answer
    Any,
    /// Not blank
    NonEmpty,
    /// Exactly one of the listed choices
    OneOf(Vec<String>),
    /// A comma-separated list, every item from the catalog
    EachOf(Vec<String>),
    /// Path to an existing, readable file (`~/` is expanded)
    ReadableFile,
}

impl Constraint {
    pub fn one_of<S: AsRef<str>>(choices: &[S]) -> Self {
        Constraint::OneOf(choices.iter().map(|c| c.as_ref().to_string()).collect())
    }

    /// Checks `raw` and returns the normalized answer
    pub fn check(&self, step: &str, raw: &str) -> Result<String, CliError> {
        let value = raw.trim();
        match self {
            Constraint::Any => Ok(value.to_string()),
            Constraint::NonEmpty => {
                if value.is_empty() {
                    Err(CliError::validation(step, "a value is required"))
                } else {
                    Ok(value.to_string())
                }
            }
            Constraint::OneOf(choices) => {
                if choices.iter().any(|c| c == value) {
                    Ok(value.to_string())
                } else {
                    Err(CliError::validation(
                        step,
                        format!("'{}' is not one of: {}", value, choices.join(", ")),
                    ))
                }
            }
            Constraint::EachOf(catalog) => {
                let items = split_flows(value);
                if items.is_empty() {
                    return Err(CliError::validation(step, "at least one value is required"));
                }
                let unknown: Vec<&str> = items
                    .iter()
                    .filter(|item| !catalog.contains(item))
                    .map(String::as_str)
                    .collect();
                if unknown.is_empty() {
                    Ok(items.join(","))
                } else {
                    Err(CliError::validation(
                        step,
                        format!(
                            "unknown: {}. Available: {}",
                            unknown.join(", "),
                            catalog.join(", ")
                        ),
                    ))
                }
            }
            Constraint::ReadableFile => {
                if value.is_empty() {
                    return Err(CliError::validation(step, "a path is required"));
                }
                let path = expand_home(value);
                if !path.is_file() {
                    return Err(CliError::validation(
                        step,
                        format!("{} does not exist or is not a file", path.display()),
                    ));
                }
                File::open(&path).map_err(|e| {
                    CliError::validation(step, format!("{} is not readable: {}", path.display(), e))
                })?;
                Ok(path.display().to_string())
            }
        }
    }
}

/// One prompt in a sequence
#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    label: String,
    default: Option<String>,
    hidden: bool,
    constraint: Constraint,
}

impl Step {
    /// `name` identifies the step in errors, `label` is what the user sees
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            default: None,
            hidden: false,
            constraint: Constraint::NonEmpty,
        }
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompts and validates
    pub fn ask(&self, prompter: &dyn Prompter) -> Result<String, CliError> {
        let raw = if self.hidden {
            prompter.prompt_hidden(&self.label)?
        } else {
            prompter.prompt(&self.label, self.default.as_deref())?
        };
        self.constraint.check(&self.name, &raw)
    }

    /// Validates `prefill` if present, otherwise prompts
    pub fn ask_or(
        &self,
        prompter: &dyn Prompter,
        prefill: Option<String>,
    ) -> Result<String, CliError> {
        match prefill {
            Some(value) => self.constraint.check(&self.name, &value),
            None => self.ask(prompter),
        }
    }

    /// Prompts only when `condition` holds
    pub fn ask_if(
        &self,
        prompter: &dyn Prompter,
        condition: bool,
    ) -> Result<Option<String>, CliError> {
        if condition {
            self.ask(prompter).map(Some)
        } else {
            Ok(None)
        }
    }
}
