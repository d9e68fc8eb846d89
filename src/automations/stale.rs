//! Nudge authors of long-open PRs.
//!
//! Each open PR older than the threshold gets one comment addressed to its
//! author and, afterwards, one Slack alert. The comment is guarded by the
//! gate under the condition `stale-<N>d`, so a scheduled run repeats nothing
//! for PRs it already handled. The marker is written only once the comment
//! has been posted.

use chrono::{DateTime, Utc};

use crate::dispatch::{Action, ActionOutcome, Dispatcher};
use crate::effects::{GitHubInterpreter, ops};
use crate::gate::{ConditionKey, MarkerStore, NotificationGate};
use crate::notify::WebhookSink;
use crate::notify::slack::stale_pr_message;
use crate::types::PrNumber;

use super::AutomationError;

pub const DEFAULT_STALE_DAYS: u32 = 3;

/// Whole days elapsed since `created_at`.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

pub fn stale_condition(stale_days: u32) -> Result<ConditionKey, AutomationError> {
    Ok(ConditionKey::parse(format!("stale-{}d", stale_days))?)
}

pub fn stale_comment(creator: &str, age_days: i64) -> String {
    format!(
        "@{} This PR has been open for {} days. Please update its status.",
        creator, age_days
    )
}

/// A PR that was nudged by this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalePr {
    pub number: PrNumber,
    pub creator: String,
    pub url: String,
    pub age_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleReport {
    /// Open PRs examined.
    pub checked: usize,
    pub notified: Vec<StalePr>,
    /// Stale PRs skipped because the gate said so.
    pub suppressed: Vec<PrNumber>,
    /// Stale PRs whose comment could not be posted.
    pub failed: Vec<PrNumber>,
    /// Slack alerts that were not delivered.
    pub webhook_failures: usize,
}

/// Comments on every open PR at least `stale_days` old that has not been
/// nudged yet, then sends one Slack alert per nudged PR.
pub async fn check_stale<G, S, W>(
    github: &G,
    gate: &NotificationGate<S>,
    sink: &W,
    stale_days: u32,
    now: DateTime<Utc>,
) -> Result<StaleReport, AutomationError>
where
    G: GitHubInterpreter + Sync,
    S: MarkerStore,
    W: WebhookSink + Sync,
{
    let condition = stale_condition(stale_days)?;
    let open = ops::list_open_prs(github).await?;
    let dispatcher = Dispatcher::new(github, sink);

    let mut report = StaleReport {
        checked: open.len(),
        ..StaleReport::default()
    };

    for pr in open {
        let age_days = age_in_days(pr.created_at, now);
        if age_days < i64::from(stale_days) {
            continue;
        }

        if !gate.should_notify(pr.number, &condition).await {
            report.suppressed.push(pr.number);
            continue;
        }

        let comment = Action::PostComment(stale_comment(&pr.author, age_days));
        let outcome = dispatcher.dispatch(pr.number, vec![comment]).await;
        if !outcome.all_succeeded() {
            report.failed.push(pr.number);
            continue;
        }

        if let Err(e) = gate.record_notified(pr.number, &condition).await {
            // The comment is already posted; the next run may repeat it.
            tracing::warn!(pr = %pr.number, error = %e, "Failed to record stale marker");
        }

        tracing::info!(pr = %pr.number, age_days, "Nudged stale PR");
        report.notified.push(StalePr {
            number: pr.number,
            creator: pr.author,
            url: pr.html_url,
            age_days,
        });
    }

    for stale in &report.notified {
        let payload = stale_pr_message(stale.number, &stale.url, &stale.creator, stale.age_days);
        let outcome = dispatcher
            .dispatch(stale.number, vec![Action::Webhook(payload)])
            .await;
        if !matches!(outcome.outcome("webhook"), Some(ActionOutcome::Applied)) {
            report.webhook_failures += 1;
        }
    }

    if report.notified.is_empty() {
        tracing::info!(checked = report.checked, "No new stale PRs");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{InMemoryMarkerStore, LabelMarkerStore};
    use crate::test_utils::{MockGitHub, RecordingSink, pr_data};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2024-06-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn age_counts_whole_days() {
        assert_eq!(age_in_days(now() - Duration::hours(71), now()), 2);
        assert_eq!(age_in_days(now() - Duration::hours(72), now()), 3);
        assert_eq!(age_in_days(now(), now()), 0);
    }

    #[test]
    fn condition_names_the_threshold() {
        assert_eq!(stale_condition(3).unwrap().as_str(), "stale-3d");
        assert_eq!(stale_condition(14).unwrap().as_str(), "stale-14d");
    }

    #[tokio::test]
    async fn stale_pr_is_nudged_once() {
        let github = MockGitHub::new()
            .with_pr(pr_data(42, "dave", now() - Duration::days(5)))
            .with_pr(pr_data(43, "erin", now() - Duration::days(1)));
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let sink = RecordingSink::ok();

        let first = check_stale(&github, &gate, &sink, 3, now()).await.unwrap();

        assert_eq!(first.checked, 2);
        assert_eq!(first.notified.len(), 1);
        assert_eq!(first.notified[0].number, PrNumber(42));
        assert_eq!(
            github.comments_on(PrNumber(42)),
            vec!["@dave This PR has been open for 5 days. Please update its status."]
        );
        assert_eq!(github.labels_on(PrNumber(42)), vec!["notified:stale-3d"]);
        assert!(github.comments_on(PrNumber(43)).is_empty());
        assert_eq!(sink.sent().len(), 1);
        assert!(sink.sent()[0].text.contains("#42"));

        let second = check_stale(&github, &gate, &sink, 3, now()).await.unwrap();

        assert!(second.notified.is_empty());
        assert_eq!(second.suppressed, vec![PrNumber(42)]);
        assert_eq!(github.comments_on(PrNumber(42)).len(), 1);
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_comment_records_no_marker() {
        let github = MockGitHub::new()
            .with_pr(pr_data(7, "dave", now() - Duration::days(10)))
            .failing("post_comment", 500);
        let store = InMemoryMarkerStore::new();
        let gate = NotificationGate::new(&store);
        let sink = RecordingSink::ok();

        let report = check_stale(&github, &gate, &sink, 3, now()).await.unwrap();

        assert_eq!(report.failed, vec![PrNumber(7)]);
        assert!(store.is_empty());
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn webhook_failure_keeps_the_comment_and_marker() {
        let github = MockGitHub::new().with_pr(pr_data(9, "dave", now() - Duration::days(4)));
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let sink = RecordingSink::with_status(500);

        let report = check_stale(&github, &gate, &sink, 3, now()).await.unwrap();

        assert_eq!(report.notified.len(), 1);
        assert_eq!(report.webhook_failures, 1);
        assert_eq!(github.comments_on(PrNumber(9)).len(), 1);
        assert_eq!(github.labels_on(PrNumber(9)), vec!["notified:stale-3d"]);
    }

    #[tokio::test]
    async fn different_thresholds_use_different_markers() {
        let github = MockGitHub::new().with_pr(pr_data(5, "dave", now() - Duration::days(8)));
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let sink = RecordingSink::ok();

        check_stale(&github, &gate, &sink, 3, now()).await.unwrap();
        let report = check_stale(&github, &gate, &sink, 7, now()).await.unwrap();

        assert_eq!(report.notified.len(), 1);
        assert_eq!(
            github.labels_on(PrNumber(5)),
            vec!["notified:stale-3d", "notified:stale-7d"]
        );
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let github = MockGitHub::new().failing("list_open_prs", 500);
        let gate = NotificationGate::new(InMemoryMarkerStore::new());
        assert!(
            check_stale(&github, &gate, &RecordingSink::ok(), 3, now())
                .await
                .is_err()
        );
    }
}
