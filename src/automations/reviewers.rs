//! Request reviews from the code owners of a PR's changed files.

use crate::codeowners::{Resolution, common_owners, resolve_outcome, without};
use crate::dispatch::{Action, DispatchReport, Dispatcher};
use crate::effects::{GitHubInterpreter, ops};
use crate::notify::UnconfiguredSink;
use crate::types::{Identity, OwnerSet, PrNumber};

use super::{AutomationError, load_codeowners};

/// What the reviewer automation decided and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerAssignment {
    pub resolution: Resolution,
    /// Owners asked to review (the author removed).
    pub reviewers: OwnerSet,
    /// Owners common to every changed file, assigned to the PR.
    pub assignees: OwnerSet,
    /// `None` when nothing was dispatched.
    pub report: Option<DispatchReport>,
}

/// Resolves owners for `pr` from the CODEOWNERS file on its head branch and
/// requests their reviews.
///
/// Teams are requested as team reviewers and skipped for assignment. The
/// PR author is never asked to review their own PR. When there is no
/// ownership file, or no rule matches, nothing is dispatched.
pub async fn assign_reviewers<G: GitHubInterpreter + Sync>(
    github: &G,
    pr: PrNumber,
) -> Result<ReviewerAssignment, AutomationError> {
    let pr_data = ops::get_pr(github, pr).await?;
    let files = ops::list_changed_files(github, pr).await?;
    let rules = load_codeowners(github, Some(&pr_data.head_ref)).await?;

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    tracing::debug!(pr = %pr, files = paths.len(), "Resolving owners");

    let resolution = resolve_outcome(rules.as_ref(), paths.iter().copied());
    resolution.log_outcome("assign-reviewers");

    let (Resolution::Matched(owners), Some(rules)) = (&resolution, rules.as_ref()) else {
        return Ok(ReviewerAssignment {
            resolution: resolution.clone(),
            reviewers: OwnerSet::new(),
            assignees: OwnerSet::new(),
            report: None,
        });
    };

    let reviewers = match Identity::parse(&pr_data.author) {
        Some(author) => without(owners.clone(), &author),
        None => owners.clone(),
    };
    let assignees = common_owners(rules, paths.iter().copied());

    let dispatcher = Dispatcher::new(github, UnconfiguredSink);
    let report = dispatcher
        .dispatch(
            pr,
            vec![
                Action::RequestReviewers(reviewers.clone()),
                Action::AddAssignees(assignees.clone()),
            ],
        )
        .await;
    tracing::info!(%report, "Reviewer assignment finished");

    Ok(ReviewerAssignment {
        resolution,
        reviewers,
        assignees,
        report: Some(report),
    })
}
