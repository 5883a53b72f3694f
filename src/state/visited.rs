use crate::entity::WorkItem;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Work items claimed during the current run
///
/// Insertion is the single point that decides which worker fetches an entity:
/// only the caller whose [`VisitedSet::insert`] returns `true` may proceed.
/// The set lives in memory only; cross-run deduplication is the checkpoint's job.
#[derive(Debug, Default)]
pub struct VisitedSet {
    items: Mutex<HashSet<WorkItem>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `item` as visited, returning false if it already was
    pub fn insert(&self, item: &WorkItem) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.contains(item) {
            return false;
        }
        items.insert(item.clone())
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
