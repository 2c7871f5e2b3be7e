//! Cross-page selection set

use ahash::{AHashSet, RandomState};
use indexmap::IndexSet;

use crate::model::RecordId;

/// Changes applied by a page reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileDelta {
    /// Identifiers newly selected
    pub added: Vec<RecordId>,

    /// Identifiers deselected
    pub removed: Vec<RecordId>,
}

impl ReconcileDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Selected record identifiers across every page of the catalog.
///
/// Only identity is stored, so members need not correspond to fetched
/// records. Iteration follows insertion order, which keeps "the first page of
/// selected items" deterministic.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: IndexSet<RecordId, RandomState>,
}

impl SelectionSet {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an identifier, returns false if it was already selected
    pub fn add(&mut self, id: RecordId) -> bool {
        self.ids.insert(id)
    }

    /// Deselect an identifier, returns false if it was not selected
    pub fn remove(&mut self, id: RecordId) -> bool {
        // shift_remove keeps the relative order of the remaining members
        self.ids.shift_remove(&id)
    }

    pub fn has(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Iterate members in stable order
    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ids.iter().copied()
    }

    /// Members at positions `[start, start + len)` of the iteration order
    pub fn slice(&self, start: usize, len: usize) -> Vec<RecordId> {
        self.ids.iter().skip(start).take(len).copied().collect()
    }

    /// Visible identifiers that are not selected, in page order
    pub fn unselected(&self, visible_ids: &[RecordId]) -> Vec<RecordId> {
        visible_ids
            .iter()
            .copied()
            .filter(|id| !self.ids.contains(id))
            .collect()
    }

    /// Apply the checked state the grid reports for the visible page.
    ///
    /// Visible ids present in `now_selected_ids` are added, visible ids absent
    /// from it are removed. Members that are not visible are never touched,
    /// and checked ids outside the visible page are ignored.
    pub fn reconcile(&mut self, visible_ids: &[RecordId], now_selected_ids: &[RecordId]) -> ReconcileDelta {
        let checked: AHashSet<RecordId> = now_selected_ids.iter().copied().collect();
        let mut delta = ReconcileDelta::default();

        for &id in visible_ids {
            if checked.contains(&id) {
                if self.ids.insert(id) {
                    delta.added.push(id);
                }
            } else if self.ids.contains(&id) {
                delta.removed.push(id);
            }
        }

        if !delta.removed.is_empty() {
            let removed: AHashSet<RecordId> = delta.removed.iter().copied().collect();
            self.ids.retain(|id| !removed.contains(id));
        }

        delta
    }
}

impl Extend<RecordId> for SelectionSet {
    fn extend<T: IntoIterator<Item = RecordId>>(&mut self, iter: T) {
        self.ids.extend(iter);
    }
}
