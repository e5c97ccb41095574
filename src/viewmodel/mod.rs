//! View-model layer: ordered, sortable projections over cached entities for
//! interactive display, mediating row edits back through [`crate::facade::StorageCore`].
//!
//! Grounded on the upstream `FavoritesModel`/`NoteModel`/`TagModel` family:
//! each view-model owns a `Vec<Uid>` order list plus a `HashMap<Uid, usize>`
//! position index that is rebuilt (not merely reversed) on a sort-key change
//! and reversed in place on an order-only change, reproducing the original's
//! `boost::multi_index` random-access re-pointing without taking on a
//! multi-index-container dependency.

mod favorites;
mod notes_by_notebook;
mod tags;

pub use favorites::{FavoriteItem, FavoriteKind, FavoritesViewModel};
pub use notes_by_notebook::NotesByNotebookViewModel;
pub use tags::TagsViewModel;

use std::collections::HashMap;

use crate::entity::Notebook;
use crate::types::LocalUid;

/// Sort key shared by every C7 view-model, per the favorites-model sort
/// contract generalized to notes-by-notebook and tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Sort by the row's entity-kind discriminant.
    Type,
    /// Sort by display name, case-sensitive.
    DisplayName,
    /// Sort by the number of notes the row targets (a notebook's note
    /// count, a tag's tagged-note count, a note's own weight of 1).
    NumNotesTargeted,
}

/// The subset of a Notebook's restriction matrix a view-model needs to
/// decide whether a row is editable, cached per notebook seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RestrictionSnapshot {
    pub can_update_notebook: bool,
    pub can_update_notes: bool,
    pub can_update_tags: bool,
    pub can_create_notes: bool,
}

impl From<&Notebook> for RestrictionSnapshot {
    fn from(notebook: &Notebook) -> Self {
        let r = &notebook.restrictions;
        Self {
            can_update_notebook: !r.no_update_notebook,
            can_update_notes: !r.no_update_notes,
            can_update_tags: !r.no_update_tags,
            can_create_notes: !r.no_create_notes,
        }
    }
}

/// Per-notebook restriction cache shared by the view-models that need it.
#[derive(Clone, Debug, Default)]
pub struct RestrictionCache {
    by_notebook: HashMap<LocalUid, RestrictionSnapshot>,
}

impl RestrictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or refreshes) the snapshot for a notebook.
    pub fn observe(&mut self, notebook: &Notebook) {
        self.by_notebook
            .insert(notebook.local_uid, RestrictionSnapshot::from(notebook));
    }

    /// Returns the cached snapshot for a notebook, if one was observed.
    pub fn get(&self, notebook_local_uid: LocalUid) -> Option<RestrictionSnapshot> {
        self.by_notebook.get(&notebook_local_uid).copied()
    }
}

/// Position-indexed reorderable row list shared by every view-model:
/// a `Vec<LocalUid>` for random-access display order plus a `HashMap<LocalUid,
/// usize>` so a row's current position can be found without a scan.
#[derive(Clone, Debug, Default)]
pub(crate) struct RowOrder {
    order: Vec<LocalUid>,
    position: HashMap<LocalUid, usize>,
}

impl RowOrder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn position_of(&self, local_uid: LocalUid) -> Option<usize> {
        self.position.get(&local_uid).copied()
    }

    pub(crate) fn contains(&self, local_uid: LocalUid) -> bool {
        self.position.contains_key(&local_uid)
    }

    pub(crate) fn push(&mut self, local_uid: LocalUid) {
        if self.contains(local_uid) {
            return;
        }
        self.position.insert(local_uid, self.order.len());
        self.order.push(local_uid);
    }

    pub(crate) fn remove(&mut self, local_uid: LocalUid) {
        let Some(pos) = self.position.remove(&local_uid) else {
            return;
        };
        self.order.remove(pos);
        self.reindex_from(pos);
    }

    /// Removes `count` rows starting at `first`, returning their uids.
    pub(crate) fn remove_range(&mut self, first: usize, count: usize) -> Vec<LocalUid> {
        let end = (first + count).min(self.order.len());
        if first >= end {
            return Vec::new();
        }
        let removed: Vec<LocalUid> = self.order.drain(first..end).collect();
        for uid in &removed {
            self.position.remove(uid);
        }
        self.reindex_from(first);
        removed
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, uid) in self.order.iter().enumerate().skip(start) {
            self.position.insert(*uid, i);
        }
    }

    /// Reverses the display order in place, preserving relative positions
    /// without a full re-sort — used when only the sort direction changes.
    pub(crate) fn reverse(&mut self) {
        self.order.reverse();
        self.reindex_from(0);
    }

    /// Replaces the order wholesale with `new_order` (e.g. after a stable
    /// re-sort on a new key), rebuilding the position index.
    pub(crate) fn set_order(&mut self, new_order: Vec<LocalUid>) {
        self.order = new_order;
        self.position.clear();
        self.reindex_from(0);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = LocalUid> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_order_tracks_positions() {
        let mut rows = RowOrder::new();
        let a = LocalUid::new();
        let b = LocalUid::new();
        rows.push(a);
        rows.push(b);
        assert_eq!(rows.position_of(a), Some(0));
        assert_eq!(rows.position_of(b), Some(1));
    }

    #[test]
    fn remove_reindexes_subsequent_rows() {
        let mut rows = RowOrder::new();
        let (a, b, c) = (LocalUid::new(), LocalUid::new(), LocalUid::new());
        rows.push(a);
        rows.push(b);
        rows.push(c);
        rows.remove(a);
        assert_eq!(rows.position_of(b), Some(0));
        assert_eq!(rows.position_of(c), Some(1));
    }

    #[test]
    fn reverse_flips_order_and_positions() {
        let mut rows = RowOrder::new();
        let (a, b) = (LocalUid::new(), LocalUid::new());
        rows.push(a);
        rows.push(b);
        rows.reverse();
        assert_eq!(rows.position_of(a), Some(1));
        assert_eq!(rows.position_of(b), Some(0));
    }

    #[test]
    fn remove_range_drops_and_returns_uids() {
        let mut rows = RowOrder::new();
        let uids: Vec<_> = (0..5).map(|_| LocalUid::new()).collect();
        for uid in &uids {
            rows.push(*uid);
        }
        let removed = rows.remove_range(1, 2);
        assert_eq!(removed, vec![uids[1], uids[2]]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.position_of(uids[3]), Some(1));
    }
}
