//! Trigger event parsing.
//!
//! GitHub Actions writes the triggering webhook payload to the file named by
//! `GITHUB_EVENT_PATH`. Automations that run on pull request events read the
//! PR straight from that payload instead of fetching it again.
//!
//! Only `pull_request` and `pull_request_target` payloads are understood.
//! Other event names parse to `Ok(None)`, as do pull request actions no
//! automation reacts to.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::PrData;
use crate::types::{PrNumber, Sha};

/// Error type for event payload failures.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read event file: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Field has invalid value (e.g., malformed SHA).
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Action performed on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Reopened,
    Synchronize,
    ReadyForReview,
    Edited,
    Labeled,
    Unlabeled,
    Assigned,
    ReviewRequested,
}

/// A pull request event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PrAction,

    /// The PR as it was when the event fired.
    pub pr: PrData,

    /// The label added or removed, for `labeled`/`unlabeled`.
    pub label: Option<String>,
}

impl PullRequestEvent {
    pub fn number(&self) -> PrNumber {
        self.pr.number
    }
}

/// Reads and parses the event file written by the Actions runner.
pub fn read_event_file(
    event_name: &str,
    path: &Path,
) -> Result<Option<PullRequestEvent>, ParseError> {
    let payload = std::fs::read(path)?;
    parse_event(event_name, &payload)
}

/// Parses an event payload.
///
/// * `Ok(Some(event))` - a pull request event with a relevant action
/// * `Ok(None)` - another event type, or an action no automation uses
/// * `Err(e)` - malformed payload or missing required fields
pub fn parse_event(event_name: &str, payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    match event_name {
        "pull_request" | "pull_request_target" => parse_pull_request(payload),
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    action: String,
    pull_request: RawPullRequest,
    label: Option<RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    user: RawUser,
    head: RawRef,
    created_at: DateTime<Utc>,
    draft: Option<bool>,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    assignees: Vec<RawUser>,
    #[serde(default)]
    requested_reviewers: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    sha: String,
    #[serde(rename = "ref")]
    ref_name: String,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PrAction::Opened,
        "reopened" => PrAction::Reopened,
        "synchronize" => PrAction::Synchronize,
        "ready_for_review" => PrAction::ReadyForReview,
        "edited" => PrAction::Edited,
        "labeled" => PrAction::Labeled,
        "unlabeled" => PrAction::Unlabeled,
        "assigned" => PrAction::Assigned,
        "review_requested" => PrAction::ReviewRequested,
        other => {
            tracing::debug!(action = other, "Ignoring pull_request action");
            return Ok(None);
        }
    };

    let pr = raw.pull_request;
    let head_sha = Sha::parse(&pr.head.sha).map_err(|_| ParseError::InvalidField {
        field: "pull_request.head.sha",
        value: pr.head.sha.clone(),
    })?;

    Ok(Some(PullRequestEvent {
        action,
        pr: PrData {
            number: PrNumber(pr.number),
            title: pr.title,
            html_url: pr.html_url,
            author: pr.user.login,
            head_ref: pr.head.ref_name,
            head_sha,
            created_at: pr.created_at,
            is_draft: pr.draft.unwrap_or(false),
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            assignees: pr.assignees.into_iter().map(|u| u.login).collect(),
            requested_reviewers: pr.requested_reviewers.into_iter().map(|u| u.login).collect(),
        },
        label: raw.label.map(|l| l.name),
    }))
}
