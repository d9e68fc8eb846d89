//! Dry-run interpreter: performs reads, logs writes.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::CommentId;

use super::github::{GitHubEffect, GitHubResponse};
use super::interpreter::GitHubInterpreter;

/// Wraps an interpreter so that reads reach the API and writes are only logged.
///
/// Writes return the response the API would have given on success. Comment
/// IDs are synthetic and count up from 1.
#[derive(Debug)]
pub struct DryRunInterpreter<I> {
    inner: I,
    next_comment_id: AtomicU64,
}

impl<I> DryRunInterpreter<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            next_comment_id: AtomicU64::new(1),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// The success response for a write; `None` for reads.
    fn simulated_response(&self, effect: &GitHubEffect) -> Option<GitHubResponse> {
        let response = match effect {
            GitHubEffect::AddLabels { .. } => GitHubResponse::LabelsAdded,
            GitHubEffect::RemoveLabel { .. } => GitHubResponse::LabelRemoved,
            GitHubEffect::CreateLabel { .. } => GitHubResponse::LabelCreated,
            GitHubEffect::UpdateLabelColor { .. } => GitHubResponse::LabelUpdated,
            GitHubEffect::PostComment { .. } => GitHubResponse::CommentPosted {
                id: CommentId(self.next_comment_id.fetch_add(1, Ordering::Relaxed)),
            },
            GitHubEffect::RequestReviewers { .. } => GitHubResponse::ReviewersRequested,
            GitHubEffect::AddAssignees { .. } => GitHubResponse::AssigneesAdded,
            GitHubEffect::GetPr { .. }
            | GitHubEffect::ListOpenPrs
            | GitHubEffect::ListChangedFiles { .. }
            | GitHubEffect::GetFileContents { .. }
            | GitHubEffect::ListLabels { .. }
            | GitHubEffect::ListRepoLabels
            | GitHubEffect::ListReviews { .. }
            | GitHubEffect::ListCheckRuns { .. }
            | GitHubEffect::GetUser { .. } => return None,
        };
        Some(response)
    }
}

impl<I> GitHubInterpreter for DryRunInterpreter<I>
where
    I: GitHubInterpreter + Sync,
{
    type Error = I::Error;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        let Some(response) = self.simulated_response(&effect) else {
            return self.inner.interpret(effect).await;
        };

        let summary = serde_json::to_string(&effect).unwrap_or_else(|_| effect.name().to_string());
        tracing::info!(effect = effect.name(), detail = %summary, "[dry-run] Skipping write");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGitHub;
    use crate::types::PrNumber;

    #[tokio::test]
    async fn writes_are_not_forwarded() {
        let mock = MockGitHub::new();
        let dry = DryRunInterpreter::new(&mock);

        let response = dry
            .interpret(GitHubEffect::PostComment {
                target: PrNumber(5),
                body: "hello".into(),
            })
            .await
            .unwrap();

        assert!(matches!(response, GitHubResponse::CommentPosted { .. }));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn reads_are_forwarded() {
        let mock = MockGitHub::new().with_labels(PrNumber(5), &["bug"]);
        let dry = DryRunInterpreter::new(&mock);

        let response = dry
            .interpret(GitHubEffect::ListLabels {
                target: PrNumber(5),
            })
            .await
            .unwrap();

        assert_eq!(response, GitHubResponse::Labels(vec!["bug".to_string()]));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn synthetic_comment_ids_increase() {
        let mock = MockGitHub::new();
        let dry = DryRunInterpreter::new(&mock);
        let post = || GitHubEffect::PostComment {
            target: PrNumber(1),
            body: "x".into(),
        };

        let first = dry.interpret(post()).await.unwrap();
        let second = dry.interpret(post()).await.unwrap();
        assert_eq!(first, GitHubResponse::CommentPosted { id: CommentId(1) });
        assert_eq!(second, GitHubResponse::CommentPosted { id: CommentId(2) });
    }
}
