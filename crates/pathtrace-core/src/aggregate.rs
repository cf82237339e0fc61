//! Shared aggregation table.
//!
//! Every state descended from one root holds a handle to the same table.
//! Cloning an [`AggregateTable`] clones the handle, not the data.

use crate::path::TracePath;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Accumulated time for one path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aggregate {
    /// Total elapsed seconds across all visits
    pub seconds: f64,
    /// Number of completed visits
    pub visits: u64,
}

/// Handle to a path → accumulated seconds table.
#[derive(Debug, Clone, Default)]
pub struct AggregateTable {
    inner: Arc<Mutex<BTreeMap<TracePath, Aggregate>>>,
}

impl AggregateTable {
    /// A fresh, unshared table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `seconds` to the entry for `path`, creating it if absent.
    /// Returns the updated aggregate.
    pub fn record(&self, path: &TracePath, seconds: f64) -> Aggregate {
        let mut table = self.inner.lock();
        let entry = table.entry(path.clone()).or_default();
        entry.seconds += seconds;
        entry.visits += 1;
        *entry
    }

    /// Aggregate recorded for `path`
    pub fn get(&self, path: &TracePath) -> Option<Aggregate> {
        self.inner.lock().get(path).copied()
    }

    /// Accumulated seconds for `path`
    pub fn seconds(&self, path: &TracePath) -> Option<f64> {
        self.get(path).map(|a| a.seconds)
    }

    /// Number of distinct paths recorded
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Snapshot of every entry in path order (shortest first).
    pub fn entries(&self) -> Vec<(TracePath, Aggregate)> {
        self.inner
            .lock()
            .iter()
            .map(|(path, aggregate)| (path.clone(), *aggregate))
            .collect()
    }

    /// Sum of all depth-1 aggregates.
    pub fn root_total(&self) -> f64 {
        self.inner
            .lock()
            .iter()
            .take_while(|(path, _)| path.len() <= 1)
            .filter(|(path, _)| path.len() == 1)
            .map(|(_, aggregate)| aggregate.seconds)
            .sum()
    }

    /// Drop every entry. Other handles see the empty table.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// True when both handles point at the same table.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}
