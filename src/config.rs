//! Repository configuration files.
//!
//! Three optional files under `.github/` tune the automations:
//!
//! - `filters.yml`: label → glob (or list of globs); the first label whose
//!   glob matches a changed file wins over CODEOWNERS-derived labels
//! - `slack-mapping.json`: `{"mappings": {"<github login>": "<slack id>"}}`
//! - `workflows.json`: `{"required_workflows": ["<check run name>", ...]}`
//!
//! A missing file is not an error: it yields the empty configuration and a
//! warning. A file that exists but cannot be parsed is a [`ConfigError`].

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::codeowners::{LabelFilter, Pattern};
use crate::notify::SlackUserMap;

pub const FILTERS_PATH: &str = ".github/filters.yml";
pub const SLACK_MAPPING_PATH: &str = ".github/slack-mapping.json";
pub const WORKFLOWS_PATH: &str = ".github/workflows.json";

/// Errors loading repository configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid label filter in {path}: {reason}")]
    Filter { path: PathBuf, reason: String },
}

/// Configuration read from a repository checkout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoConfig {
    pub label_filters: Vec<LabelFilter>,
    pub slack_users: SlackUserMap,
    pub required_workflows: Vec<String>,
}

impl RepoConfig {
    /// Loads every config file relative to `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            label_filters: load_label_filters(&root.join(FILTERS_PATH))?,
            slack_users: load_slack_users(&root.join(SLACK_MAPPING_PATH))?,
            required_workflows: load_required_workflows(&root.join(WORKFLOWS_PATH))?,
        })
    }
}

/// A filter value: one glob or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGlobs {
    One(String),
    Many(Vec<String>),
}

impl RawGlobs {
    fn into_vec(self) -> Vec<String> {
        match self {
            RawGlobs::One(glob) => vec![glob],
            RawGlobs::Many(globs) => globs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowsFile {
    #[serde(default)]
    required_workflows: Vec<String>,
}

pub fn load_label_filters(path: &Path) -> Result<Vec<LabelFilter>, ConfigError> {
    match read_optional(path)? {
        Some(text) => parse_label_filters(&text, path),
        None => Ok(Vec::new()),
    }
}

/// Parses `filters.yml`, keeping the file's label order.
///
/// Globs that fail to compile are dropped with a warning; a label left with
/// no usable glob is dropped entirely.
pub fn parse_label_filters(text: &str, path: &Path) -> Result<Vec<LabelFilter>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mapping: Option<serde_yaml::Mapping> =
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    let mut filters = Vec::new();
    for (key, value) in mapping.unwrap_or_default() {
        let label = match key {
            serde_yaml::Value::String(s) => s,
            other => {
                return Err(ConfigError::Filter {
                    path: path.to_path_buf(),
                    reason: format!("label must be a string, got {:?}", other),
                });
            }
        };

        let globs: RawGlobs =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Filter {
                path: path.to_path_buf(),
                reason: format!("label {:?}: {}", label, e),
            })?;

        let patterns: Vec<Pattern> = globs
            .into_vec()
            .iter()
            .filter_map(|glob| match Pattern::compile(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(label = %label, glob = %glob, error = %e, "Skipping invalid filter glob");
                    None
                }
            })
            .collect();

        if patterns.is_empty() {
            tracing::warn!(label = %label, "Label filter has no usable globs; ignoring it");
            continue;
        }
        filters.push(LabelFilter { label, patterns });
    }

    tracing::debug!(count = filters.len(), "Loaded label filters");
    Ok(filters)
}

pub fn load_slack_users(path: &Path) -> Result<SlackUserMap, ConfigError> {
    let Some(text) = read_optional(path)? else {
        return Ok(SlackUserMap::default());
    };
    let users: SlackUserMap = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(count = users.mappings.len(), "Loaded Slack user mapping");
    Ok(users)
}

pub fn load_required_workflows(path: &Path) -> Result<Vec<String>, ConfigError> {
    let Some(text) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    let file: WorkflowsFile = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(workflows = ?file.required_workflows, "Loaded required workflows");
    Ok(file.required_workflows)
}

/// Reads a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config file not found; using defaults");
            Ok(None)
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
