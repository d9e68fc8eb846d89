//! Markers stored as labels on the target PR or issue.

use crate::effects::{EffectError, GitHubInterpreter, ops};
use crate::types::PrNumber;

use super::{ConditionKey, MarkerStore, NotificationRecord};

/// Default prefix for marker labels.
pub const DEFAULT_MARKER_PREFIX: &str = "notified:";

/// Keeps each marker as a label named `<prefix><condition>`.
///
/// Labels are visible to people browsing the PR, and removing the label by
/// hand re-arms the condition. Adding a label that is already present is a
/// no-op on GitHub, so recording is idempotent.
#[derive(Debug, Clone)]
pub struct LabelMarkerStore<G> {
    github: G,
    prefix: String,
}

impl<G> LabelMarkerStore<G> {
    pub fn new(github: G) -> Self {
        Self::with_prefix(github, DEFAULT_MARKER_PREFIX)
    }

    pub fn with_prefix(github: G, prefix: impl Into<String>) -> Self {
        Self {
            github,
            prefix: prefix.into(),
        }
    }

    /// The label that marks `condition`.
    pub fn label_for(&self, condition: &ConditionKey) -> String {
        format!("{}{}", self.prefix, condition)
    }
}

impl<G> MarkerStore for LabelMarkerStore<G>
where
    G: GitHubInterpreter + Sync,
{
    type Error = EffectError;

    async fn contains(&self, target: PrNumber, condition: &ConditionKey) -> Result<bool, EffectError> {
        let wanted = self.label_for(condition);
        let labels = ops::list_labels(&self.github, target).await?;
        Ok(labels.iter().any(|l| *l == wanted))
    }

    async fn insert(&self, record: &NotificationRecord) -> Result<(), EffectError> {
        let label = self.label_for(&record.condition);
        ops::add_labels(&self.github, record.target, vec![label]).await
    }
}
