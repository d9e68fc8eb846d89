//! Process-local marker store.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Mutex;

use crate::types::PrNumber;

use super::{ConditionKey, MarkerStore, NotificationRecord};

/// Markers held in memory for the lifetime of the process.
///
/// Not durable: only suitable for tests and for gating within one run.
#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    markers: Mutex<HashSet<(PrNumber, ConditionKey)>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<(PrNumber, ConditionKey)>> {
        // A poisoned set is still a valid set of markers.
        self.markers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MarkerStore for InMemoryMarkerStore {
    type Error = Infallible;

    async fn contains(&self, target: PrNumber, condition: &ConditionKey) -> Result<bool, Infallible> {
        Ok(self.lock().contains(&(target, condition.clone())))
    }

    async fn insert(&self, record: &NotificationRecord) -> Result<(), Infallible> {
        self.lock().insert((record.target, record.condition.clone()));
        Ok(())
    }
}
