//! Announce a PR in Slack once its required checks pass.
//!
//! The announcement mentions everyone who should look at the PR: its
//! assignees, its requested reviewers and, optionally, the code owners of
//! its changed files. It is posted under the author's name and avatar and
//! is sent at most once per PR (condition `pr-announced`).

use std::collections::BTreeSet;
use std::time::Duration;

use crate::codeowners::resolve_outcome;
use crate::dispatch::{Action, ActionOutcome, DispatchReport, Dispatcher};
use crate::effects::{CheckRunData, GitHubInterpreter, PrData, ops};
use crate::gate::{ConditionKey, MarkerStore, NotificationGate};
use crate::notify::slack::pr_ready_message;
use crate::notify::{SlackUserMap, WebhookSink};
use crate::types::{Identity, PrNumber, Sha};

use super::{AutomationError, avatar_url, load_codeowners};

pub const ANNOUNCED_CONDITION: &str = "pr-announced";

/// Bounds the wait for required checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    /// 120 polls, 30 seconds apart: one hour.
    pub const DEFAULT: PollConfig = PollConfig {
        max_attempts: 120,
        interval: Duration::from_secs(30),
    };
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnounceConfig {
    /// Check run names that must all succeed on the head commit.
    pub required_workflows: Vec<String>,
    pub slack_users: SlackUserMap,
    /// Also mention the code owners of the changed files.
    pub use_codeowners: bool,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Announced(DispatchReport),
    /// The announcement was attempted but the webhook failed; no marker was
    /// recorded, so a later run will try again.
    DeliveryFailed(DispatchReport),
    AlreadyAnnounced,
}

/// Returns the required check names that have not yet succeeded.
pub fn pending_checks(required: &[String], runs: &[CheckRunData]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !runs.iter().any(|r| &r.name == *name && r.succeeded()))
        .cloned()
        .collect()
}

/// Polls check runs on `sha` until every required check has succeeded.
///
/// Returns the number of polls made, or `None` if the checks did not pass
/// within `poll.max_attempts`. Failed polls count as attempts.
pub async fn wait_for_checks<G: GitHubInterpreter>(
    github: &G,
    sha: &Sha,
    required: &[String],
    poll: PollConfig,
) -> Option<u32> {
    for attempt in 1..=poll.max_attempts {
        match ops::list_check_runs(github, sha).await {
            Ok(runs) => {
                let pending = pending_checks(required, &runs);
                if pending.is_empty() {
                    tracing::info!(sha = %sha.short(), attempt, "All required checks passed");
                    return Some(attempt);
                }
                tracing::info!(sha = %sha.short(), attempt, pending = ?pending, "Waiting for required checks");
            }
            Err(e) => {
                tracing::warn!(sha = %sha.short(), attempt, error = %e, "Failed to fetch check runs");
            }
        }
        if attempt < poll.max_attempts {
            tokio::time::sleep(poll.interval).await;
        }
    }
    tracing::warn!(sha = %sha.short(), attempts = poll.max_attempts, "Required checks did not pass in time");
    None
}

/// Everyone the announcement should mention.
async fn people_to_notify<G: GitHubInterpreter>(
    github: &G,
    pr: &PrData,
    use_codeowners: bool,
) -> Result<BTreeSet<Identity>, AutomationError> {
    let mut people: BTreeSet<Identity> = pr
        .assignees
        .iter()
        .chain(&pr.requested_reviewers)
        .filter_map(|login| Identity::parse(login))
        .collect();

    if use_codeowners {
        let files = ops::list_changed_files(github, pr.number).await?;
        let rules = load_codeowners(github, Some(&pr.head_ref)).await?;
        let resolution = resolve_outcome(rules.as_ref(), files.iter().map(|f| f.path.as_str()));
        resolution.log_outcome("announce");
        people.extend(resolution.into_owners());
    }

    Ok(people)
}

/// Waits for the PR's required checks, then announces it once.
///
/// Fails with [`AutomationError::ChecksNotPassed`] when the checks do not
/// pass in time. The gate is consulted before waiting so an announced PR
/// costs one label lookup, not an hour of polling.
pub async fn announce_pr<G, S, W>(
    github: &G,
    gate: &NotificationGate<S>,
    sink: &W,
    pr: &PrData,
    config: &AnnounceConfig,
) -> Result<AnnounceOutcome, AutomationError>
where
    G: GitHubInterpreter + Sync,
    S: MarkerStore,
    W: WebhookSink + Sync,
{
    let condition = ConditionKey::parse(ANNOUNCED_CONDITION)?;
    if !gate.should_notify(pr.number, &condition).await {
        return Ok(AnnounceOutcome::AlreadyAnnounced);
    }

    if wait_for_checks(github, &pr.head_sha, &config.required_workflows, config.poll)
        .await
        .is_none()
    {
        return Err(AutomationError::ChecksNotPassed {
            pr: pr.number,
            attempts: config.poll.max_attempts,
        });
    }

    let people = people_to_notify(github, pr, config.use_codeowners).await?;
    let avatar = avatar_url(github, &pr.author).await;
    let payload = pr_ready_message(pr, &people, &config.slack_users).posted_as(&pr.author, avatar);

    let report = Dispatcher::new(github, sink)
        .dispatch(pr.number, vec![Action::Webhook(payload)])
        .await;

    if !matches!(report.outcome("webhook"), Some(ActionOutcome::Applied)) {
        return Ok(AnnounceOutcome::DeliveryFailed(report));
    }

    record(gate, pr.number, &condition).await;
    Ok(AnnounceOutcome::Announced(report))
}

async fn record<S: MarkerStore>(gate: &NotificationGate<S>, pr: PrNumber, condition: &ConditionKey) {
    if let Err(e) = gate.record_notified(pr, condition).await {
        tracing::warn!(pr = %pr, error = %e, "Failed to record announcement marker");
    }
}
