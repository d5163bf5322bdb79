//! Prompter backed by the terminal

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};

use super::Prompter;
use crate::domain::CliError;

/// Interactive prompts on stderr via `dialoguer`
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

fn input_failed(label: &str, err: dialoguer::Error) -> CliError {
    CliError::validation(label, format!("input failed: {}", err))
}

impl Prompter for TerminalPrompter {
    fn section(&self, title: &str, help: &str) {
        eprintln!();
        eprintln!("{}", format!("# {}", title).blue().bold());
        if !help.is_empty() {
            eprintln!("{}", help);
        }
    }

    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String, CliError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(|e| input_failed(label, e))
    }

    fn prompt_hidden(&self, label: &str) -> Result<String, CliError> {
        Password::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| input_failed(label, e))
    }

    fn prompt_hidden_confirmed(&self, label: &str) -> Result<String, CliError> {
        Password::with_theme(&self.theme)
            .with_prompt(label)
            .with_confirmation("Repeat for confirmation", "The values don't match")
            .interact()
            .map_err(|e| input_failed(label, e))
    }

    fn confirm(&self, label: &str, default: bool) -> Result<bool, CliError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(label)
            .default(default)
            .interact()
            .map_err(|e| input_failed(label, e))
    }
}
