//! At-most-once notification gate.
//!
//! Automations run many times for the same PR (every push, label change or
//! scheduled tick). The gate keeps one durable marker per (target, condition)
//! pair; an action guarded by the gate runs only while the marker is absent,
//! and the marker is written after the action succeeds.
//!
//! # Race tolerance
//!
//! Checking and recording are two separate calls against an external store
//! with no compare-and-set. Two invocations racing on the same target can
//! both observe "absent" and both deliver. The gate therefore gives
//! at-most-once delivery on a best-effort basis only: duplicates are possible
//! under concurrent invocations, never under sequential ones.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PrNumber;

pub mod label;
pub mod memory;

pub use label::LabelMarkerStore;
pub use memory::InMemoryMarkerStore;

/// Error returned when a condition key is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid condition key {0:?}: must be non-empty with no whitespace")]
pub struct InvalidConditionKey(pub String);

/// Names the condition an action was performed for, e.g. `stale-3d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConditionKey(String);

impl ConditionKey {
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidConditionKey> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(InvalidConditionKey(s));
        }
        Ok(ConditionKey(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConditionKey {
    type Err = InvalidConditionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConditionKey {
    type Error = InvalidConditionKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ConditionKey> for String {
    fn from(key: ConditionKey) -> String {
        key.0
    }
}

/// "This condition already triggered an action for this target."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub target: PrNumber,
    pub condition: ConditionKey,
    pub timestamp: DateTime<Utc>,
}

/// Durable storage for notification markers.
pub trait MarkerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns true if a marker exists for (target, condition).
    fn contains(
        &self,
        target: PrNumber,
        condition: &ConditionKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Writes a marker. Writing an existing marker succeeds.
    fn insert(
        &self,
        record: &NotificationRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl<T: MarkerStore + Sync> MarkerStore for &T {
    type Error = T::Error;

    fn contains(
        &self,
        target: PrNumber,
        condition: &ConditionKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        (**self).contains(target, condition)
    }

    fn insert(
        &self,
        record: &NotificationRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).insert(record)
    }
}

/// Outcome of asking the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No marker: perform the action.
    Proceed,
    /// A marker exists: the action already happened.
    DuplicateSuppressed,
}

/// Gate failures.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("marker lookup failed for {target} ({condition}): {source}")]
    Lookup {
        target: PrNumber,
        condition: ConditionKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("marker write failed for {target} ({condition}): {source}")]
    Record {
        target: PrNumber,
        condition: ConditionKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Guards actions with durable markers.
#[derive(Debug, Clone)]
pub struct NotificationGate<S> {
    store: S,
}

impl<S: MarkerStore> NotificationGate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Looks up the marker for (target, condition).
    pub async fn check(
        &self,
        target: PrNumber,
        condition: &ConditionKey,
    ) -> Result<GateDecision, GateError> {
        let found = self
            .store
            .contains(target, condition)
            .await
            .map_err(|e| GateError::Lookup {
                target,
                condition: condition.clone(),
                source: Box::new(e),
            })?;

        Ok(if found {
            GateDecision::DuplicateSuppressed
        } else {
            GateDecision::Proceed
        })
    }

    /// Returns true if the action for (target, condition) has not happened yet.
    ///
    /// A failed lookup returns false: without knowing whether the action
    /// already happened, skipping it is the only way to avoid a duplicate.
    pub async fn should_notify(&self, target: PrNumber, condition: &ConditionKey) -> bool {
        match self.check(target, condition).await {
            Ok(GateDecision::Proceed) => true,
            Ok(GateDecision::DuplicateSuppressed) => {
                tracing::info!(pr = %target, condition = %condition, "Already notified; skipping");
                false
            }
            Err(e) => {
                tracing::warn!(pr = %target, condition = %condition, error = %e, "Gate lookup failed; skipping action");
                false
            }
        }
    }

    /// Records that the action for (target, condition) happened.
    pub async fn record_notified(
        &self,
        target: PrNumber,
        condition: &ConditionKey,
    ) -> Result<NotificationRecord, GateError> {
        let record = NotificationRecord {
            target,
            condition: condition.clone(),
            timestamp: Utc::now(),
        };
        self.store
            .insert(&record)
            .await
            .map_err(|e| GateError::Record {
                target,
                condition: condition.clone(),
                source: Box::new(e),
            })?;
        tracing::debug!(pr = %target, condition = %condition, "Recorded notification marker");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockGitHub, arb_pr_number};
    use proptest::prelude::*;

    fn key(s: &str) -> ConditionKey {
        ConditionKey::parse(s).unwrap()
    }

    #[test]
    fn condition_key_validation() {
        assert!(ConditionKey::parse("stale-3d").is_ok());
        assert!(ConditionKey::parse("").is_err());
        assert!(ConditionKey::parse("has space").is_err());
        assert!(ConditionKey::parse("tab\there").is_err());
    }

    #[test]
    fn condition_key_serde_validates() {
        let ok: ConditionKey = serde_json::from_str(r#""pr-announced""#).unwrap();
        assert_eq!(ok.as_str(), "pr-announced");
        assert!(serde_json::from_str::<ConditionKey>(r#""bad key""#).is_err());
    }

    #[tokio::test]
    async fn stale_notification_flow_with_labels() {
        let github = MockGitHub::new();
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let pr = PrNumber(42);
        let condition = key("stale-3d");

        assert!(gate.should_notify(pr, &condition).await);
        crate::effects::ops::post_comment(&github, pr, "@dave ping".into())
            .await
            .unwrap();
        gate.record_notified(pr, &condition).await.unwrap();

        assert!(!gate.should_notify(pr, &condition).await);
        assert_eq!(github.comments_on(pr).len(), 1);
    }

    #[tokio::test]
    async fn conditions_and_targets_are_independent() {
        let gate = NotificationGate::new(InMemoryMarkerStore::new());
        gate.record_notified(PrNumber(1), &key("stale-3d")).await.unwrap();

        assert!(gate.should_notify(PrNumber(1), &key("pr-announced")).await);
        assert!(gate.should_notify(PrNumber(2), &key("stale-3d")).await);
        assert_eq!(
            gate.check(PrNumber(1), &key("stale-3d")).await.unwrap(),
            GateDecision::DuplicateSuppressed
        );
    }

    #[tokio::test]
    async fn recording_twice_is_harmless() {
        let github = MockGitHub::new();
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let condition = key("pr-announced");

        gate.record_notified(PrNumber(3), &condition).await.unwrap();
        gate.record_notified(PrNumber(3), &condition).await.unwrap();

        assert_eq!(github.labels_on(PrNumber(3)), vec!["notified:pr-announced"]);
    }

    #[tokio::test]
    async fn lookup_failure_fails_closed() {
        let github = MockGitHub::new().failing("list_labels", 502);
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));
        let condition = key("stale-3d");

        assert!(!gate.should_notify(PrNumber(4), &condition).await);
        assert!(matches!(
            gate.check(PrNumber(4), &condition).await,
            Err(GateError::Lookup { .. })
        ));
    }

    #[tokio::test]
    async fn record_failure_is_reported() {
        let github = MockGitHub::new().failing("add_labels", 403);
        let gate = NotificationGate::new(LabelMarkerStore::new(&github));

        let err = gate
            .record_notified(PrNumber(5), &key("stale-3d"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Record { .. }));
    }

    fn arb_condition() -> impl Strategy<Value = ConditionKey> {
        "[a-z][a-z0-9-]{0,15}".prop_map(|s| ConditionKey::parse(s).unwrap())
    }

    proptest! {
        /// Property: after record_notified(T, C), should_notify(T, C) is false.
        #[test]
        fn prop_recorded_conditions_are_suppressed(
            recorded in prop::collection::vec((arb_pr_number(), arb_condition()), 0..8),
            probe in (arb_pr_number(), arb_condition()),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let gate = NotificationGate::new(InMemoryMarkerStore::new());
                for (target, condition) in &recorded {
                    gate.record_notified(*target, condition).await.unwrap();
                }

                for (target, condition) in &recorded {
                    assert!(!gate.should_notify(*target, condition).await);
                }
                let expected = !recorded.contains(&probe);
                assert_eq!(gate.should_notify(probe.0, &probe.1).await, expected);
            });
        }
    }
}
