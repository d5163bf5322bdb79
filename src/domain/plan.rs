//! Plan domain model
//!
//! A plan maps a trigger (commits, tags, or manual runs) to the CumulusCI
//! flows the site runs for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::CliError;

/// What starts a build for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Branch commits matching a regex
    Commit,
    /// New tags matching a regex
    Tag,
    /// Only started by hand
    Manual,
}

impl TriggerType {
    pub const CHOICES: [&'static str; 3] = ["commit", "tag", "manual"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Commit => "commit",
            TriggerType::Tag => "tag",
            TriggerType::Manual => "manual",
        }
    }

    /// Returns true if this trigger matches refs against a regex
    pub fn needs_regex(&self) -> bool {
        !matches!(self, TriggerType::Manual)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "commit" => Ok(TriggerType::Commit),
            "tag" => Ok(TriggerType::Tag),
            "manual" => Ok(TriggerType::Manual),
            other => Err(CliError::validation(
                "trigger type",
                format!(
                    "'{}' is an invalid trigger type. Valid choices are: {}",
                    other,
                    Self::CHOICES.join(", ")
                ),
            )),
        }
    }
}

/// A plan as returned by the site
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub org: String,
    #[serde(default, deserialize_with = "flow_list")]
    pub flows: Vec<String>,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub public: bool,
}

/// The site stores flows as a comma-separated string; newer responses use a list
fn flow_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flows {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Option::<Flows>::deserialize(deserializer)? {
        Some(Flows::Joined(s)) => split_flows(&s),
        Some(Flows::List(list)) => list,
        None => Vec::new(),
    })
}

/// Splits a comma-separated flow list, dropping blanks
pub fn split_flows(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// A validated plan ready to be created on the site
///
/// Only [`PlanRequest::new`] builds one, so a regex is present exactly when
/// the trigger needs one and manual plans are always active.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    name: String,
    description: String,
    org: String,
    flows: Vec<String>,
    trigger_type: TriggerType,
    regex: Option<String>,
    context: Option<String>,
    active: bool,
    public: bool,
    repo_id: u64,
}

/// Loose inputs for [`PlanRequest::new`]
#[derive(Debug, Clone, Default)]
pub struct PlanDraft {
    pub name: String,
    pub description: String,
    pub org: String,
    pub flows: Vec<String>,
    pub trigger_type: Option<TriggerType>,
    pub regex: Option<String>,
    pub context: Option<String>,
    pub active: bool,
    pub public: bool,
    pub repo_id: u64,
}

impl PlanRequest {
    pub fn new(draft: PlanDraft) -> Result<Self, CliError> {
        if draft.name.trim().is_empty() {
            return Err(CliError::validation("name", "must not be empty"));
        }
        if draft.org.trim().is_empty() {
            return Err(CliError::validation("org", "must not be empty"));
        }
        if draft.flows.is_empty() {
            return Err(CliError::validation("flows", "at least one flow is required"));
        }

        let trigger_type = draft
            .trigger_type
            .ok_or_else(|| CliError::validation("trigger type", "must be set"))?;

        let regex = draft.regex.filter(|r| !r.trim().is_empty());
        let regex = match (trigger_type.needs_regex(), regex) {
            (true, Some(r)) => Some(r),
            (true, None) => {
                return Err(CliError::validation(
                    "regex",
                    format!("a regex is required for {} triggers", trigger_type),
                ))
            }
            (false, Some(_)) => {
                return Err(CliError::validation(
                    "regex",
                    "manual plans do not match refs against a regex",
                ))
            }
            (false, None) => None,
        };

        let active = trigger_type == TriggerType::Manual || draft.active;

        Ok(Self {
            name: draft.name,
            description: draft.description,
            org: draft.org,
            flows: draft.flows,
            trigger_type,
            regex,
            context: draft.context.filter(|c| !c.trim().is_empty()),
            active,
            public: draft.public,
            repo_id: draft.repo_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    pub fn regex(&self) -> Option<&str> {
        self.regex.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Parameters for the `plans/create` call
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("name".into(), Value::from(self.name.clone()));
        params.insert("description".into(), Value::from(self.description.clone()));
        params.insert("org".into(), Value::from(self.org.clone()));
        params.insert("flows".into(), Value::from(self.flows.join(",")));
        params.insert("type".into(), Value::from(self.trigger_type.as_str()));
        params.insert("regex".into(), self.regex.clone().map_or(Value::Null, Value::from));
        params.insert("context".into(), self.context.clone().map_or(Value::Null, Value::from));
        params.insert("active".into(), Value::from(self.active));
        params.insert("public".into(), Value::from(self.public));
        params.insert("repo_id".into(), Value::from(self.repo_id));
        params
    }
}
