//! Size labels from the number of changed lines.

use crate::effects::{ChangedFile, GitHubInterpreter, ops};
use crate::types::PrNumber;

use super::AutomationError;

/// A size label and the inclusive range of changed lines it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBucket {
    pub label: &'static str,
    pub min: u64,
    /// `None` means unbounded.
    pub max: Option<u64>,
    pub color: &'static str,
}

impl SizeBucket {
    pub fn contains(&self, lines: u64) -> bool {
        lines >= self.min && self.max.is_none_or(|max| lines <= max)
    }
}

/// Buckets in priority order. Adjacent ranges share their boundary; the
/// first bucket containing the count wins, so 20 lines is `XS`.
pub const SIZE_BUCKETS: [SizeBucket; 6] = [
    SizeBucket { label: "XS", min: 0, max: Some(20), color: "388E3C" },
    SizeBucket { label: "S", min: 20, max: Some(50), color: "4CAF50" },
    SizeBucket { label: "M", min: 50, max: Some(100), color: "FFEB3B" },
    SizeBucket { label: "L", min: 100, max: Some(500), color: "FF9800" },
    SizeBucket { label: "XL", min: 500, max: Some(1000), color: "F44336" },
    SizeBucket { label: "XXL", min: 1000, max: None, color: "B71C1C" },
];

/// Total additions plus deletions.
pub fn changed_lines(files: &[ChangedFile]) -> u64 {
    files.iter().map(|f| f.additions + f.deletions).sum()
}

pub fn bucket_for(lines: u64) -> &'static SizeBucket {
    SIZE_BUCKETS
        .iter()
        .find(|b| b.contains(lines))
        .unwrap_or(&SIZE_BUCKETS[SIZE_BUCKETS.len() - 1])
}

fn is_size_label(name: &str) -> bool {
    SIZE_BUCKETS.iter().any(|b| b.label == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLabelReport {
    pub changed_lines: u64,
    pub label: &'static str,
    /// Stale size labels taken off the PR.
    pub removed: Vec<String>,
    pub created: bool,
    pub recolored: bool,
    /// False when the PR already carried the label.
    pub added: bool,
}

/// Replaces any size label on `pr` with the one matching its diff size.
pub async fn apply_size_label<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
) -> Result<SizeLabelReport, AutomationError> {
    let files = ops::list_changed_files(github, pr).await?;
    let lines = changed_lines(&files);
    let bucket = bucket_for(lines);
    tracing::info!(pr = %pr, lines, label = bucket.label, "Computed size label");

    let current = ops::list_labels(github, pr).await?;
    let mut report = SizeLabelReport {
        changed_lines: lines,
        label: bucket.label,
        removed: Vec::new(),
        created: false,
        recolored: false,
        added: false,
    };

    for stale in current
        .iter()
        .filter(|l| is_size_label(l) && l.as_str() != bucket.label)
    {
        match ops::remove_label(github, pr, stale).await {
            Ok(()) => {
                tracing::info!(pr = %pr, label = %stale, "Removed size label");
                report.removed.push(stale.clone());
            }
            Err(e) => tracing::warn!(pr = %pr, label = %stale, error = %e, "Failed to remove size label"),
        }
    }

    if current.iter().any(|l| l == bucket.label) {
        tracing::info!(pr = %pr, label = bucket.label, "Size label already assigned");
        return Ok(report);
    }

    let existing = ops::list_repo_labels(github).await?;
    match existing.iter().find(|l| l.name == bucket.label) {
        None => {
            ops::create_label(github, bucket.label, bucket.color, None).await?;
            report.created = true;
        }
        // The API reports colours in lower case.
        Some(label) if !label.color.eq_ignore_ascii_case(bucket.color) => {
            match ops::update_label_color(github, bucket.label, bucket.color).await {
                Ok(()) => report.recolored = true,
                Err(e) => tracing::warn!(label = bucket.label, error = %e, "Failed to update label colour"),
            }
        }
        Some(_) => {}
    }

    ops::add_labels(github, pr, vec![bucket.label.to_string()]).await?;
    report.added = true;
    tracing::info!(pr = %pr, label = bucket.label, "Assigned size label");
    Ok(report)
}
