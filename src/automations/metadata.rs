//! Remind authors of labelled PRs about follow-up work.

use crate::dispatch::{Action, ActionOutcome, DispatchError, Dispatcher};
use crate::effects::{GitHubInterpreter, PrData};
use crate::gate::{ConditionKey, MarkerStore, NotificationGate};
use crate::notify::slack::metadata_reminder_message;
use crate::notify::{SlackUserMap, WebhookError, WebhookSink};

use super::{AutomationError, avatar_url};

pub const DEFAULT_REMINDER_LABEL: &str = "database";

pub const REMINDER_CONDITION: &str = "metadata-reminder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    /// The PR does not carry the label.
    NotApplicable,
    AlreadyReminded,
    Failed(WebhookError),
}

/// Sends a one-time Slack reminder to the author of `pr` if it carries
/// `label`.
pub async fn remind_metadata<G, S, W>(
    github: &G,
    gate: &NotificationGate<S>,
    sink: &W,
    pr: &PrData,
    label: &str,
    users: &SlackUserMap,
) -> Result<ReminderOutcome, AutomationError>
where
    G: GitHubInterpreter + Sync,
    S: MarkerStore,
    W: WebhookSink + Sync,
{
    if !pr.labels.iter().any(|l| l == label) {
        tracing::info!(pr = %pr.number, label, "Label not present; no reminder");
        return Ok(ReminderOutcome::NotApplicable);
    }

    let condition = ConditionKey::parse(REMINDER_CONDITION)?;
    if !gate.should_notify(pr.number, &condition).await {
        return Ok(ReminderOutcome::AlreadyReminded);
    }

    let avatar = avatar_url(github, &pr.author).await;
    let payload = metadata_reminder_message(pr, label, users).posted_as(&pr.author, avatar);
    let report = Dispatcher::new(github, sink)
        .dispatch(pr.number, vec![Action::Webhook(payload)])
        .await;

    if let Some(ActionOutcome::Failed(DispatchError::Webhook(e))) = report.outcome("webhook") {
        return Ok(ReminderOutcome::Failed(e.clone()));
    }

    if let Err(e) = gate.record_notified(pr.number, &condition).await {
        tracing::warn!(pr = %pr.number, error = %e, "Failed to record reminder marker");
    }
    tracing::info!(pr = %pr.number, "Sent metadata reminder");
    Ok(ReminderOutcome::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::InMemoryMarkerStore;
    use crate::test_utils::{MockGitHub, RecordingSink, pr_data};
    use crate::types::PrNumber;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn labelled(labels: &[&str]) -> PrData {
        PrData {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            ..pr_data(30, "alice", Utc::now())
        }
    }

    fn users() -> SlackUserMap {
        SlackUserMap {
            mappings: BTreeMap::from([("alice".to_string(), "U1".to_string())]),
        }
    }

    #[tokio::test]
    async fn reminds_once() {
        let github = MockGitHub::new().with_user("alice", "https://avatars/alice");
        let gate = NotificationGate::new(InMemoryMarkerStore::new());
        let sink = RecordingSink::ok();
        let pr = labelled(&["database", "backend"]);

        let first = remind_metadata(&github, &gate, &sink, &pr, "database", &users())
            .await
            .unwrap();
        let second = remind_metadata(&github, &gate, &sink, &pr, "database", &users())
            .await
            .unwrap();

        assert_eq!(first, ReminderOutcome::Sent);
        assert_eq!(second, ReminderOutcome::AlreadyReminded);
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text,
            "<@U1>, your PR *<https://github.com/acme/widgets/pull/30|PR 30>* has the *'database'* label! \
             Don't forget to release fields in metadata."
        );
        assert_eq!(sent[0].icon_url.as_deref(), Some("https://avatars/alice"));
    }

    #[tokio::test]
    async fn unlabelled_pr_is_skipped() {
        let github = MockGitHub::new();
        let gate = NotificationGate::new(InMemoryMarkerStore::new());
        let sink = RecordingSink::ok();

        let outcome = remind_metadata(&github, &gate, &sink, &labelled(&["frontend"]), "database", &users())
            .await
            .unwrap();

        assert_eq!(outcome, ReminderOutcome::NotApplicable);
        assert!(sink.sent().is_empty());
        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_can_be_retried() {
        let github = MockGitHub::new();
        let store = InMemoryMarkerStore::new();
        let gate = NotificationGate::new(&store);
        let pr = labelled(&["database"]);

        let outcome = remind_metadata(&github, &gate, &RecordingSink::with_status(404), &pr, "database", &users())
            .await
            .unwrap();

        assert_eq!(outcome, ReminderOutcome::Failed(WebhookError::Status(404)));
        assert!(store.is_empty());
        assert!(gate.should_notify(PrNumber(30), &ConditionKey::parse(REMINDER_CONDITION).unwrap()).await);
    }
}
