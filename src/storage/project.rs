//! Local CumulusCI project discovery
//!
//! Plan commands and `site create` run inside a git checkout that carries a
//! `cumulusci.yml`.
//! The project provides the flow catalog and the GitHub repository the
//! site knows the project by.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;

const PROJECT_FILE: &str = "cumulusci.yml";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("You must be inside a local git repository configured for CumulusCI. No cumulusci.yml was found")]
    NotInProject,

    #[error("Invalid repository '{0}': expected OwnerName/RepoName")]
    InvalidRepo(String),

    #[error("Could not determine the GitHub repository from the git remote")]
    NoRemote,
}

/// A GitHub repository reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parses a GitHub remote URL (`https://github.com/o/r.git` or `git@github.com:o/r.git`)
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let url = url.trim();
        let path = if let Some(rest) = url.strip_prefix("git@") {
            rest.split_once(':')?.1
        } else {
            let without_scheme = url.split_once("://")?.1;
            without_scheme.split_once('/')?.1
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        path.parse().ok()
    }
}

impl FromStr for RepoRef {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ProjectError::InvalidRepo(s.to_string())),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A CumulusCI project on disk
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    flows: Vec<String>,
}

impl Project {
    /// Opens the project rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config_path = root.join(PROJECT_FILE);
        if !config_path.is_file() {
            return Err(ProjectError::NotInProject.into());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let flows = parse_flows(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Self { root, flows })
    }

    /// Opens the project containing the current directory
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = Self::find_root(&cwd).ok_or(ProjectError::NotInProject)?;
        Self::open(root)
    }

    /// Finds the nearest ancestor holding a `cumulusci.yml`
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            if current.join(PROJECT_FILE).is_file() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Flow names declared by the project, sorted
    pub fn flows(&self) -> &[String] {
        &self.flows
    }

    /// Repository of the `origin` remote
    pub fn repo(&self) -> Result<RepoRef> {
        let output = Command::new("git")
            .args(["config", "--get", "remote.origin.url"])
            .current_dir(&self.root)
            .output()
            .context("Failed to run git")?;

        if !output.status.success() {
            return Err(ProjectError::NoRemote.into());
        }

        let url = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(remote = %url.trim(), "resolved git remote");
        RepoRef::from_remote_url(&url).ok_or_else(|| ProjectError::NoRemote.into())
    }
}

/// Extracts the sorted keys of the top-level `flows` mapping
fn parse_flows(content: &str) -> Result<Vec<String>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
    let mut flows: Vec<String> = doc
        .get("flows")
        .and_then(|f| f.as_mapping())
        .map(|mapping| {
            mapping
                .keys()
                .filter_map(|k| k.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    flows.sort();
    Ok(flows)
}
