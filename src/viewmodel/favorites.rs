//! The Favorites view-model: an ordered, sortable projection of favorited
//! Notebooks, Tags, Notes and SavedSearches, mediating renames and removals
//! back through [`crate::facade::StorageCore`].
//!
//! Grounded on the upstream `FavoritesModel`: a single table of
//! heterogeneous rows distinguished by kind, refreshed via paginated listing
//! requests and kept in a stable, remappable sort order.

use crate::entity::{Notebook, SavedSearch, Tag};
use crate::error::{Result, StorageCoreError};
use crate::facade::StorageCore;
use crate::search::{ListFilter, SortDirection as ListSortDirection, SortOrder};
use crate::types::{LocalUid, WhichGuid};

use super::{RestrictionCache, RowOrder, SortKey};

/// Page size used when refreshing from storage, matching the upstream
/// Favorites model's paginated listing requests.
const PAGE_SIZE: u32 = 40;

/// Which entity family a favorite row projects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FavoriteKind {
    Notebook,
    Tag,
    Note,
    SavedSearch,
}

/// One row of the favorites projection.
#[derive(Clone, Debug, PartialEq)]
pub struct FavoriteItem {
    pub local_uid: LocalUid,
    pub kind: FavoriteKind,
    pub display_name: String,
    pub target_note_count: u64,
}

/// Ordered, sortable projection of favorited entities.
pub struct FavoritesViewModel {
    rows: RowOrder,
    items: std::collections::HashMap<LocalUid, FavoriteItem>,
    restrictions: RestrictionCache,
    sort_key: SortKey,
    sort_direction: ListSortDirection,
}

impl FavoritesViewModel {
    /// Creates an empty view-model; call [`Self::refresh`] to populate it.
    pub fn new() -> Self {
        Self {
            rows: RowOrder::new(),
            items: std::collections::HashMap::new(),
            restrictions: RestrictionCache::new(),
            sort_key: SortKey::DisplayName,
            sort_direction: ListSortDirection::Ascending,
        }
    }

    /// Rows in current display order.
    pub fn rows(&self) -> Vec<&FavoriteItem> {
        self.rows.iter().filter_map(|uid| self.items.get(&uid)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.len() == 0
    }

    /// Refreshes favorited Notes and SavedSearches from storage, paginating
    /// `PAGE_SIZE` at a time as the upstream model does on construction.
    /// Notebooks and Tags carry no persisted favorited flag in this schema
    /// (mirroring the upstream protocol, which only tracks favorited status
    /// for Notes and SavedSearches); callers that maintain their own
    /// notebook/tag shortcuts add them via [`Self::upsert_notebook`] /
    /// [`Self::upsert_tag`].
    pub fn refresh(&mut self, core: &StorageCore) -> Result<()> {
        let mut seen = std::collections::HashSet::new();

        let mut offset = 0;
        loop {
            let filter = ListFilter {
                favorited_only: true,
                ..ListFilter::all()
            };
            let page = core.list_notes(filter, Some(PAGE_SIZE), offset, SortOrder::Natural, ListSortDirection::Ascending)?;
            if page.is_empty() {
                break;
            }
            let got = page.len() as u32;
            for note in page {
                seen.insert(note.local_uid);
                self.upsert(FavoriteItem {
                    local_uid: note.local_uid,
                    kind: FavoriteKind::Note,
                    display_name: note.title,
                    target_note_count: 1,
                });
            }
            offset += got;
            if got < PAGE_SIZE {
                break;
            }
        }

        let mut offset = 0;
        loop {
            let filter = ListFilter {
                favorited_only: true,
                ..ListFilter::all()
            };
            let page = core.list_saved_searches(filter, Some(PAGE_SIZE), offset, SortOrder::Natural, ListSortDirection::Ascending)?;
            if page.is_empty() {
                break;
            }
            let got = page.len() as u32;
            for search in page {
                seen.insert(search.local_uid);
                self.upsert(FavoriteItem {
                    local_uid: search.local_uid,
                    kind: FavoriteKind::SavedSearch,
                    display_name: search.name,
                    target_note_count: 0,
                });
            }
            offset += got;
            if got < PAGE_SIZE {
                break;
            }
        }

        // Drop rows for entities no longer favorited, preserving any
        // notebook/tag rows a caller added manually.
        let stale: Vec<LocalUid> = self
            .items
            .iter()
            .filter(|(uid, item)| {
                matches!(item.kind, FavoriteKind::Note | FavoriteKind::SavedSearch) && !seen.contains(uid)
            })
            .map(|(uid, _)| *uid)
            .collect();
        for uid in stale {
            self.remove_local(uid);
        }

        self.resort();
        Ok(())
    }

    /// Adds or refreshes a favorited Notebook row, recording its restriction
    /// snapshot so a later [`Self::set_display_name`] can refuse a rename
    /// without a round trip to storage.
    pub fn upsert_notebook(&mut self, notebook: &Notebook, target_note_count: u64) {
        self.restrictions.observe(notebook);
        self.upsert(FavoriteItem {
            local_uid: notebook.local_uid,
            kind: FavoriteKind::Notebook,
            display_name: notebook.name.clone(),
            target_note_count,
        });
        self.resort();
    }

    /// Adds or refreshes a favorited Tag row.
    pub fn upsert_tag(&mut self, tag: &Tag, target_note_count: u64) {
        self.upsert(FavoriteItem {
            local_uid: tag.local_uid,
            kind: FavoriteKind::Tag,
            display_name: tag.name.clone(),
            target_note_count,
        });
        self.resort();
    }

    fn upsert(&mut self, item: FavoriteItem) {
        self.rows.push(item.local_uid);
        self.items.insert(item.local_uid, item);
    }

    fn remove_local(&mut self, local_uid: LocalUid) {
        self.rows.remove(local_uid);
        self.items.remove(&local_uid);
    }

    /// Changes sort key/direction. An order-only change reverses the
    /// existing index in place; a key change re-sorts with a stable
    /// comparator and rebuilds the position index, per the favorites sort
    /// contract.
    pub fn sort(&mut self, key: SortKey, direction: ListSortDirection) {
        if key == self.sort_key {
            if direction != self.sort_direction {
                self.rows.reverse();
            }
            self.sort_direction = direction;
            return;
        }
        self.sort_key = key;
        self.sort_direction = direction;
        self.resort();
    }

    fn resort(&mut self) {
        let mut uids: Vec<LocalUid> = self.rows.iter().collect();
        let items = &self.items;
        uids.sort_by(|a, b| {
            let (ia, ib) = (&items[a], &items[b]);
            let ordering = match self.sort_key {
                SortKey::Type => u8_key(ia.kind).cmp(&u8_key(ib.kind)),
                SortKey::DisplayName => ia.display_name.cmp(&ib.display_name),
                SortKey::NumNotesTargeted => ia.target_note_count.cmp(&ib.target_note_count),
            };
            match self.sort_direction {
                ListSortDirection::Ascending => ordering,
                ListSortDirection::Descending => ordering.reverse(),
            }
        });
        self.rows.set_order(uids);
    }

    /// Renames a row's underlying entity: refuses if another cached entity
    /// of the same kind already uses the name, or (for a Notebook row) if
    /// its last-observed restriction snapshot forbids updating it; otherwise
    /// dispatches the update through the façade. On failure the
    /// authoritative state is restored via a follow-up `find`, matching the
    /// upstream `UpdateFailed` recovery path.
    pub fn set_display_name(&mut self, core: &StorageCore, local_uid: LocalUid, new_name: String) -> Result<()> {
        let kind = self
            .items
            .get(&local_uid)
            .map(|item| item.kind)
            .ok_or_else(|| StorageCoreError::invariant_violation("unknown favorite row"))?;

        let name_upper = new_name.to_uppercase();
        let name_taken = self.items.iter().any(|(uid, item)| {
            *uid != local_uid && item.kind == kind && item.display_name.to_uppercase() == name_upper
        });
        if name_taken {
            return Err(StorageCoreError::conflict(format!(
                "another favorite of the same kind already uses the name '{new_name}'"
            )));
        }

        if kind == FavoriteKind::Notebook {
            if let Some(snapshot) = self.restrictions.get(local_uid) {
                if !snapshot.can_update_notebook {
                    return Err(StorageCoreError::restriction(
                        "notebook forbids being renamed",
                    ));
                }
            }
        }

        let rename_result: Result<String> = match kind {
            FavoriteKind::Notebook => core
                .update_notebook(local_uid, crate::entity::NotebookUpdate {
                    name: Some(new_name.clone()),
                    ..Default::default()
                })
                .map(|nb| nb.name),
            FavoriteKind::Tag => core
                .update_tag(local_uid, crate::entity::TagUpdate {
                    name: Some(new_name.clone()),
                    ..Default::default()
                })
                .map(|t| t.name),
            FavoriteKind::Note => core
                .update_note(local_uid, crate::entity::NoteUpdate {
                    title: Some(new_name.clone()),
                    ..Default::default()
                })
                .map(|n| n.title),
            FavoriteKind::SavedSearch => core
                .update_saved_search(local_uid, crate::entity::SavedSearchUpdate {
                    name: Some(new_name.clone()),
                    ..Default::default()
                })
                .map(|s| s.name),
        };

        match rename_result {
            Ok(name) => {
                if let Some(item) = self.items.get_mut(&local_uid) {
                    item.display_name = name;
                }
                self.resort();
                Ok(())
            }
            Err(err) => {
                self.restore_authoritative(core, local_uid, kind)?;
                Err(err)
            }
        }
    }

    fn restore_authoritative(&mut self, core: &StorageCore, local_uid: LocalUid, kind: FavoriteKind) -> Result<()> {
        let restored_name = match kind {
            FavoriteKind::Notebook => core.find_notebook(local_uid.to_string(), WhichGuid::LocalUid).map(|nb| nb.name),
            FavoriteKind::Tag => core.find_tag(local_uid.to_string(), WhichGuid::LocalUid).map(|t| t.name),
            FavoriteKind::Note => core.find_note(local_uid.to_string(), WhichGuid::LocalUid).map(|n| n.title),
            FavoriteKind::SavedSearch => core.find_saved_search(local_uid.to_string(), WhichGuid::LocalUid).map(|s| s.name),
        }?;
        if let Some(item) = self.items.get_mut(&local_uid) {
            item.display_name = restored_name;
        }
        Ok(())
    }

    /// Unfavorites `count` rows starting at display position `first`: for
    /// Note/SavedSearch rows, clears the `favorited` flag through the
    /// façade; Notebook/Tag rows (no persisted flag in this schema) are
    /// simply dropped from the projection.
    pub fn remove_rows(&mut self, core: &StorageCore, first: usize, count: usize) -> Result<()> {
        let removed = self.rows.remove_range(first, count);
        for uid in removed {
            let Some(item) = self.items.remove(&uid) else { continue };
            match item.kind {
                FavoriteKind::Note => {
                    core.update_note(uid, crate::entity::NoteUpdate {
                        favorited: Some(false),
                        ..Default::default()
                    })?;
                }
                FavoriteKind::SavedSearch => {
                    core.update_saved_search(uid, crate::entity::SavedSearchUpdate {
                        favorited: Some(false),
                        ..Default::default()
                    })?;
                }
                FavoriteKind::Notebook | FavoriteKind::Tag => {}
            }
        }
        Ok(())
    }
}

impl Default for FavoritesViewModel {
    fn default() -> Self {
        Self::new()
    }
}

fn u8_key(kind: FavoriteKind) -> u8 {
    match kind {
        FavoriteKind::Notebook => 0,
        FavoriteKind::Tag => 1,
        FavoriteKind::Note => 2,
        FavoriteKind::SavedSearch => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entity::{NewNote, NewNotebook, NewSavedSearch};
    use tempfile::tempdir;

    fn sample_item(name: &str, count: u64) -> FavoriteItem {
        FavoriteItem {
            local_uid: LocalUid::new(),
            kind: FavoriteKind::Note,
            display_name: name.into(),
            target_note_count: count,
        }
    }

    #[test]
    fn sort_by_display_name_is_stable_ascending() {
        let mut vm = FavoritesViewModel::new();
        vm.upsert(sample_item("Banana", 1));
        vm.upsert(sample_item("Apple", 1));
        vm.sort(SortKey::DisplayName, ListSortDirection::Ascending);
        let names: Vec<&str> = vm.rows().iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Banana"]);
    }

    #[test]
    fn order_only_change_reverses_in_place() {
        let mut vm = FavoritesViewModel::new();
        vm.upsert(sample_item("Apple", 1));
        vm.upsert(sample_item("Banana", 1));
        vm.sort(SortKey::DisplayName, ListSortDirection::Ascending);
        vm.sort(SortKey::DisplayName, ListSortDirection::Descending);
        let names: Vec<&str> = vm.rows().iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["Banana", "Apple"]);
    }

    #[test]
    fn refresh_picks_up_favorited_notes_and_searches() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
            .unwrap();
        let note = core
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "Starred".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap();
        core.update_note(note.local_uid, crate::entity::NoteUpdate {
            favorited: Some(true),
            ..Default::default()
        })
        .unwrap();
        core.add_saved_search(NewSavedSearch {
            name: "Q".into(),
            query: "tag:work".into(),
            ..Default::default()
        })
        .unwrap();

        let mut vm = FavoritesViewModel::new();
        vm.refresh(&core).unwrap();
        assert_eq!(vm.len(), 1);
        assert_eq!(vm.rows()[0].display_name, "Starred");
        core.close().unwrap();
    }

    #[test]
    fn set_display_name_refuses_duplicate_name_within_kind() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
            .unwrap();
        let taken = core
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "Taken".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap();
        let renaming = core
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "Renaming".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap();

        let mut vm = FavoritesViewModel::new();
        vm.upsert(FavoriteItem {
            local_uid: taken.local_uid,
            kind: FavoriteKind::Note,
            display_name: "Taken".into(),
            target_note_count: 0,
        });
        vm.upsert(FavoriteItem {
            local_uid: renaming.local_uid,
            kind: FavoriteKind::Note,
            display_name: "Renaming".into(),
            target_note_count: 1,
        });

        let err = vm.set_display_name(&core, renaming.local_uid, "taken".into()).unwrap_err();
        assert!(err.is_conflict());
        core.close().unwrap();
    }

    #[test]
    fn set_display_name_refuses_renaming_a_restricted_notebook() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook {
                name: "Locked".into(),
                restrictions: crate::entity::NotebookRestrictions {
                    no_update_notebook: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();

        let mut vm = FavoritesViewModel::new();
        vm.upsert_notebook(&notebook, 0);

        let err = vm
            .set_display_name(&core, notebook.local_uid, "Renamed".into())
            .unwrap_err();
        assert!(err.is_restriction());

        let unchanged = core.find_notebook(notebook.local_uid.to_string(), WhichGuid::LocalUid).unwrap();
        assert_eq!(unchanged.name, "Locked");
        core.close().unwrap();
    }
}
