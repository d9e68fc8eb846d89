//! Decide whether a PR may be merged automatically.
//!
//! The check only reports; merging is left to the caller (typically a
//! workflow step gated on the exit status).

use serde::Serialize;

use crate::effects::{GitHubInterpreter, ReviewData, ReviewState, ops};
use crate::types::PrNumber;

use super::AutomationError;

/// Label that opts a PR out of auto-merge.
pub const OPT_OUT_LABEL: &str = "no-auto-merge";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    OptOutLabel,
    NotApproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEligibility {
    Eligible,
    Ineligible(IneligibleReason),
}

impl MergeEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, MergeEligibility::Eligible)
    }
}

/// Machine-readable result, printed as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoMergeReport {
    pub pr: PrNumber,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<IneligibleReason>,
}

impl AutoMergeReport {
    pub fn new(pr: PrNumber, eligibility: MergeEligibility) -> Self {
        let reason = match eligibility {
            MergeEligibility::Eligible => None,
            MergeEligibility::Ineligible(reason) => Some(reason),
        };
        Self {
            pr,
            eligible: reason.is_none(),
            reason,
        }
    }
}

/// The opt-out label wins over approval. Any single approving review is
/// enough.
pub fn decide(labels: &[String], reviews: &[ReviewData]) -> MergeEligibility {
    if labels.iter().any(|l| l == OPT_OUT_LABEL) {
        return MergeEligibility::Ineligible(IneligibleReason::OptOutLabel);
    }
    if !reviews.iter().any(|r| r.state == ReviewState::Approved) {
        return MergeEligibility::Ineligible(IneligibleReason::NotApproved);
    }
    MergeEligibility::Eligible
}

pub async fn check_auto_merge<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
) -> Result<MergeEligibility, AutomationError> {
    let labels = ops::list_labels(github, pr).await?;
    if labels.iter().any(|l| l == OPT_OUT_LABEL) {
        tracing::info!(pr = %pr, "PR has the opt-out label; skipping auto-merge");
        return Ok(MergeEligibility::Ineligible(IneligibleReason::OptOutLabel));
    }

    let reviews = ops::list_reviews(github, pr).await?;
    let eligibility = decide(&labels, &reviews);
    tracing::info!(pr = %pr, ?eligibility, "Auto-merge check finished");
    Ok(eligibility)
}
