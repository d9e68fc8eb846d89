//! Path-derived PR labels.
//!
//! Two sources feed labels:
//!
//! - **Label filters** (`.github/filters.yml`): a label mapped to one or more
//!   globs, matched against the whole path. The first changed file that hits
//!   a filter decides the result on its own: that single label is returned
//!   and CODEOWNERS-derived labels are discarded.
//! - **CODEOWNERS directories**: every wildcard-free CODEOWNERS pattern is a
//!   candidate label. Each file gets the most specific candidate that is one
//!   of its directory prefixes (or the file path itself).

use std::collections::{BTreeSet, HashSet};

use super::pattern::Pattern;
use super::rules::RuleSet;

/// A label and the globs that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    pub label: String,
    pub patterns: Vec<Pattern>,
}

impl LabelFilter {
    /// Returns true if any of the filter's globs matches the whole path.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_full(path))
    }
}

/// Returns the wildcard-free CODEOWNERS paths usable as labels.
pub fn directory_labels(rules: &RuleSet) -> HashSet<String> {
    rules
        .rules()
        .iter()
        .filter_map(|r| r.pattern.literal_path())
        .collect()
}

/// Computes the labels for a set of changed paths.
pub fn path_labels<'a, I>(rules: &RuleSet, filters: &[LabelFilter], paths: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let candidates = directory_labels(rules);
    let mut labels = BTreeSet::new();

    for path in paths {
        if let Some(filter) = filters.iter().find(|f| f.matches(path)) {
            tracing::debug!(path, label = %filter.label, "Matched label filter");
            return BTreeSet::from([filter.label.clone()]);
        }

        if let Some(label) = most_specific_prefix(path, &candidates) {
            tracing::debug!(path, label = %label, "Matched CODEOWNERS directory label");
            labels.insert(label);
        }
    }

    labels
}

fn most_specific_prefix(path: &str, candidates: &HashSet<String>) -> Option<String> {
    let parts: Vec<&str> = path.split('/').collect();
    (1..=parts.len())
        .rev()
        .map(|i| parts[..i].join("/"))
        .find(|prefix| candidates.contains(prefix))
}
