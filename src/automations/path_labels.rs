//! Label a PR by the directories it touches.

use std::collections::{BTreeSet, HashSet};

use crate::codeowners::{LabelFilter, path_labels};
use crate::effects::{EffectError, GitHubInterpreter, ops};
use crate::types::PrNumber;

use super::{AutomationError, load_codeowners};

/// Colour for labels created from the directory structure.
pub const DEFAULT_LABEL_COLOR: &str = "CCCCCC";

pub const LABEL_DESCRIPTION: &str = "Auto-generated from directory structure";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathLabelReport {
    pub labels: BTreeSet<String>,
    /// Repository labels created by this run.
    pub created: Vec<String>,
    /// Labels that could not be created. They are still applied to the PR.
    pub create_failures: Vec<(String, EffectError)>,
}

/// Computes path labels for `pr` and applies them, creating any label the
/// repository does not have yet.
pub async fn label_paths<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
    filters: &[LabelFilter],
) -> Result<PathLabelReport, AutomationError> {
    let pr_data = ops::get_pr(github, pr).await?;
    let files = ops::list_changed_files(github, pr).await?;
    let rules = load_codeowners(github, Some(&pr_data.head_ref))
        .await?
        .unwrap_or_default();

    let labels = path_labels(&rules, filters, files.iter().map(|f| f.path.as_str()));
    if labels.is_empty() {
        tracing::info!(pr = %pr, "No matching labels found");
        return Ok(PathLabelReport::default());
    }
    tracing::info!(pr = %pr, labels = ?labels, "Found path labels");

    let existing: HashSet<String> = ops::list_repo_labels(github)
        .await?
        .into_iter()
        .map(|l| l.name)
        .collect();

    let mut report = PathLabelReport {
        labels,
        ..PathLabelReport::default()
    };

    for label in report.labels.iter().filter(|l| !existing.contains(*l)) {
        match ops::create_label(github, label, DEFAULT_LABEL_COLOR, Some(LABEL_DESCRIPTION)).await {
            Ok(()) => {
                tracing::info!(label = %label, "Created label");
                report.created.push(label.clone());
            }
            Err(e) => {
                tracing::warn!(label = %label, error = %e, "Failed to create label");
                report.create_failures.push((label.clone(), e));
            }
        }
    }

    ops::add_labels(github, pr, report.labels.iter().cloned().collect()).await?;
    tracing::info!(pr = %pr, "Applied path labels");

    Ok(report)
}
