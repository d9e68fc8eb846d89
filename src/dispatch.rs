//! Side-effect dispatch.
//!
//! The dispatcher performs a batch of independent actions against one
//! target. Every action is attempted regardless of how earlier ones fared,
//! and nothing is rolled back: GitHub and the chat webhook offer no
//! transactions, so a comment that was posted stays posted even if the
//! webhook call after it fails.
//!
//! Reviewer requests are issued one identity at a time, so a single invalid
//! identity (not a collaborator, deleted team) fails alone instead of failing
//! the whole request.

use std::fmt;

use thiserror::Error;

use crate::effects::{EffectError, GitHubInterpreter, ops};
use crate::notify::{WebhookError, WebhookPayload, WebhookSink};
use crate::types::{Identity, OwnerSet, PrNumber};

/// An external side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Request reviews from each identity.
    RequestReviewers(OwnerSet),
    /// Assign users to the target. Teams are skipped.
    AddAssignees(OwnerSet),
    /// Post a comment.
    PostComment(String),
    /// Add labels.
    AddLabels(Vec<String>),
    /// Deliver a chat payload.
    Webhook(WebhookPayload),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::RequestReviewers(_) => "request_reviewers",
            Action::AddAssignees(_) => "add_assignees",
            Action::PostComment(_) => "post_comment",
            Action::AddLabels(_) => "add_labels",
            Action::Webhook(_) => "webhook",
        }
    }
}

/// Why an action failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Api(#[from] EffectError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

/// Result of a reviewer request for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOutcome {
    pub identity: Identity,
    pub result: Result<(), EffectError>,
}

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Nothing to do (e.g. an empty owner set).
    Skipped(&'static str),
    Failed(DispatchError),
    /// Per-identity results of a reviewer request.
    PerIdentity(Vec<IdentityOutcome>),
}

impl ActionOutcome {
    /// True unless the action (or any identity in it) failed.
    pub fn is_ok(&self) -> bool {
        match self {
            ActionOutcome::Applied | ActionOutcome::Skipped(_) => true,
            ActionOutcome::Failed(_) => false,
            ActionOutcome::PerIdentity(results) => results.iter().all(|r| r.result.is_ok()),
        }
    }
}

/// One action and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: &'static str,
    pub outcome: ActionOutcome,
}

/// Outcomes of a dispatch batch, in the order the actions were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub target: PrNumber,
    pub actions: Vec<ActionReport>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.actions.iter().all(|a| a.outcome.is_ok())
    }

    pub fn outcome(&self, action: &str) -> Option<&ActionOutcome> {
        self.actions
            .iter()
            .find(|a| a.action == action)
            .map(|a| &a.outcome)
    }

    /// Logs each failure at warn level.
    pub fn log_failures(&self) {
        for report in &self.actions {
            match &report.outcome {
                ActionOutcome::Failed(e) => {
                    tracing::warn!(pr = %self.target, action = report.action, error = %e, "Action failed")
                }
                ActionOutcome::PerIdentity(results) => {
                    for r in results {
                        if let Err(e) = &r.result {
                            tracing::warn!(
                                pr = %self.target,
                                identity = %r.identity,
                                error = %e,
                                "Reviewer request failed"
                            );
                        }
                    }
                }
                ActionOutcome::Applied | ActionOutcome::Skipped(_) => {}
            }
        }
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.actions.iter().filter(|a| !a.outcome.is_ok()).count();
        write!(
            f,
            "{}: {} action(s), {} failed",
            self.target,
            self.actions.len(),
            failed
        )
    }
}

/// Performs actions against GitHub and a webhook sink.
pub struct Dispatcher<G, W> {
    github: G,
    sink: W,
}

impl<G, W> Dispatcher<G, W>
where
    G: GitHubInterpreter,
    W: WebhookSink,
{
    pub fn new(github: G, sink: W) -> Self {
        Self { github, sink }
    }

    /// Runs every action, in order, and reports each outcome.
    pub async fn dispatch(&self, target: PrNumber, actions: Vec<Action>) -> DispatchReport {
        let mut reports = Vec::with_capacity(actions.len());
        for action in actions {
            let name = action.name();
            let outcome = self.perform(target, action).await;
            match &outcome {
                ActionOutcome::Applied => tracing::info!(pr = %target, action = name, "Action applied"),
                ActionOutcome::Skipped(reason) => {
                    tracing::debug!(pr = %target, action = name, reason, "Action skipped")
                }
                _ => {}
            }
            reports.push(ActionReport {
                action: name,
                outcome,
            });
        }

        let report = DispatchReport {
            target,
            actions: reports,
        };
        report.log_failures();
        report
    }

    async fn perform(&self, target: PrNumber, action: Action) -> ActionOutcome {
        match action {
            Action::RequestReviewers(owners) => self.request_reviewers(target, owners).await,
            Action::AddAssignees(owners) => {
                let users: Vec<String> = owners
                    .iter()
                    .filter(|o| !o.is_team())
                    .map(|o| o.as_str().to_string())
                    .collect();
                if users.is_empty() {
                    return ActionOutcome::Skipped("no assignable users");
                }
                completed(ops::add_assignees(&self.github, target, users).await)
            }
            Action::PostComment(body) => {
                completed(ops::post_comment(&self.github, target, body).await.map(|_| ()))
            }
            Action::AddLabels(labels) => {
                if labels.is_empty() {
                    return ActionOutcome::Skipped("no labels");
                }
                completed(ops::add_labels(&self.github, target, labels).await)
            }
            Action::Webhook(payload) => match self.sink.send(&payload).await {
                Ok(()) => ActionOutcome::Applied,
                Err(e) => ActionOutcome::Failed(DispatchError::Webhook(e)),
            },
        }
    }

    async fn request_reviewers(&self, target: PrNumber, owners: OwnerSet) -> ActionOutcome {
        if owners.is_empty() {
            return ActionOutcome::Skipped("no reviewers");
        }

        let mut results = Vec::with_capacity(owners.len());
        for identity in owners {
            let (users, teams) = match identity.team_slug() {
                Some(slug) => (vec![], vec![slug.to_string()]),
                None => (vec![identity.as_str().to_string()], vec![]),
            };
            let result = ops::request_reviewers(&self.github, target, users, teams).await;
            results.push(IdentityOutcome { identity, result });
        }
        ActionOutcome::PerIdentity(results)
    }
}

fn completed(result: Result<(), EffectError>) -> ActionOutcome {
    match result {
        Ok(()) => ActionOutcome::Applied,
        Err(e) => ActionOutcome::Failed(DispatchError::Api(e)),
    }
}
