//! Repository automations.
//!
//! Each automation is an async function over a [`GitHubInterpreter`] and,
//! where it notifies people, a [`WebhookSink`] and a
//! [`NotificationGate`]. They are independent of how they were triggered:
//! the CLI wires them to Actions events and schedules.
//!
//! Only a failed *required read* (the PR itself, its changed files, the
//! ownership file) aborts an automation with an [`AutomationError`]. Failed
//! writes are logged and reported, and the remaining writes still run.
//!
//! [`WebhookSink`]: crate::notify::WebhookSink
//! [`NotificationGate`]: crate::gate::NotificationGate

use thiserror::Error;

use crate::codeowners::{DEFAULT_CODEOWNERS_PATH, RuleSet};
use crate::effects::{EffectError, GitHubInterpreter, ops};
use crate::gate::{GateError, InvalidConditionKey};
use crate::types::PrNumber;

pub mod announce;
pub mod auto_merge;
pub mod metadata;
pub mod path_labels;
pub mod reviewers;
pub mod size_label;
pub mod stale;

pub use announce::{AnnounceConfig, AnnounceOutcome, PollConfig, announce_pr};
pub use auto_merge::{AutoMergeReport, IneligibleReason, MergeEligibility, check_auto_merge};
pub use metadata::{ReminderOutcome, remind_metadata};
pub use path_labels::{PathLabelReport, label_paths};
pub use reviewers::{ReviewerAssignment, assign_reviewers};
pub use size_label::{SizeLabelReport, apply_size_label};
pub use stale::{StaleReport, check_stale};

/// Errors that abort an automation.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error(transparent)]
    Api(#[from] EffectError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Condition(#[from] InvalidConditionKey),

    #[error("required checks for {pr} did not pass after {attempts} attempts")]
    ChecksNotPassed { pr: PrNumber, attempts: u32 },
}

/// Fetches and parses the ownership file at `git_ref` (default branch when
/// `None`). Returns `None` when the file does not exist.
pub async fn load_codeowners<G: GitHubInterpreter>(
    github: &G,
    git_ref: Option<&str>,
) -> Result<Option<RuleSet>, EffectError> {
    let Some(text) = ops::get_file_contents(github, DEFAULT_CODEOWNERS_PATH, git_ref).await? else {
        tracing::warn!(git_ref = ?git_ref, "No CODEOWNERS file found");
        return Ok(None);
    };

    let parsed = RuleSet::parse(&text);
    parsed.log_diagnostics();
    tracing::debug!(rules = parsed.rules.len(), "Loaded CODEOWNERS");
    Ok(Some(parsed.rules))
}

/// Looks up a user's avatar, treating any failure as "no avatar".
async fn avatar_url<G: GitHubInterpreter>(github: &G, login: &str) -> Option<String> {
    match ops::get_user(github, login).await {
        Ok(user) => user.avatar_url,
        Err(e) => {
            tracing::warn!(login, error = %e, "Failed to fetch avatar");
            None
        }
    }
}
