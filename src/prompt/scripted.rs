//! Prompter that replays canned answers

use std::cell::RefCell;
use std::collections::VecDeque;

use super::Prompter;
use crate::domain::CliError;

/// A canned answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Confirm(bool),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    pub fn yes() -> Self {
        Answer::Confirm(true)
    }

    pub fn no() -> Self {
        Answer::Confirm(false)
    }
}

/// Replays answers in order and records every label it was asked
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Labels asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }

    fn next(&self, label: &str) -> Result<Answer, CliError> {
        self.asked.borrow_mut().push(label.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CliError::validation(label, "no scripted answer left"))
    }

    fn next_text(&self, label: &str) -> Result<String, CliError> {
        match self.next(label)? {
            Answer::Text(value) => Ok(value),
            Answer::Confirm(_) => Err(CliError::validation(label, "expected text, script has a confirmation")),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn section(&self, _title: &str, _help: &str) {}

    fn prompt(&self, label: &str, default: Option<&str>) -> Result<String, CliError> {
        let value = self.next_text(label)?;
        match default {
            Some(default) if value.is_empty() => Ok(default.to_string()),
            _ => Ok(value),
        }
    }

    fn prompt_hidden(&self, label: &str) -> Result<String, CliError> {
        self.next_text(label)
    }

    fn prompt_hidden_confirmed(&self, label: &str) -> Result<String, CliError> {
        self.next_text(label)
    }

    fn confirm(&self, label: &str, _default: bool) -> Result<bool, CliError> {
        match self.next(label)? {
            Answer::Confirm(value) => Ok(value),
            Answer::Text(_) => Err(CliError::validation(label, "expected a confirmation, script has text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order() {
        let p = ScriptedPrompter::new(vec![Answer::text("a"), Answer::yes()]);
        assert_eq!(p.prompt("First", None).unwrap(), "a");
        assert!(p.confirm("Second?", false).unwrap());
        assert_eq!(p.asked(), vec!["First", "Second?"]);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn exhausted_script_is_an_error() {
        let p = ScriptedPrompter::new(vec![]);
        assert!(p.prompt("Anything", None).is_err());
    }

    #[test]
    fn mismatched_answer_kind_is_an_error() {
        let p = ScriptedPrompter::new(vec![Answer::no()]);
        assert!(p.prompt_hidden("Token").is_err());
    }
}
