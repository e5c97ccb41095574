//! Notes-by-notebook view-model: an ordered projection of the Notes in one
//! Notebook, with a tag-name index populated on demand and per-notebook
//! "can create notes" gating for new-note creation.
//!
//! Generalizes the favorites worked example (spec §4.7) to the Notes table,
//! grounded on the upstream `NoteModel`.

use std::collections::HashMap;

use crate::entity::{Note, NoteUpdate};
use crate::error::Result;
use crate::facade::StorageCore;
use crate::search::{ListFilter, SortDirection, SortOrder};
use crate::types::{Guid, LocalUid, WhichGuid};

use super::{RestrictionCache, RowOrder, SortKey};

const PAGE_SIZE: u32 = 40;

/// Ordered projection of the Notes belonging to one Notebook.
pub struct NotesByNotebookViewModel {
    notebook_local_uid: LocalUid,
    rows: RowOrder,
    notes: HashMap<LocalUid, Note>,
    tag_names: HashMap<Guid, String>,
    restrictions: RestrictionCache,
    sort_key: SortKey,
    sort_direction: SortDirection,
}

impl NotesByNotebookViewModel {
    pub fn new(notebook_local_uid: LocalUid) -> Self {
        Self {
            notebook_local_uid,
            rows: RowOrder::new(),
            notes: HashMap::new(),
            tag_names: HashMap::new(),
            restrictions: RestrictionCache::new(),
            sort_key: SortKey::DisplayName,
            sort_direction: SortDirection::Ascending,
        }
    }

    pub fn rows(&self) -> Vec<&Note> {
        self.rows.iter().filter_map(|uid| self.notes.get(&uid)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reloads every Note in the notebook, paginating `PAGE_SIZE` at a time,
    /// and refreshes the notebook's cached restriction snapshot.
    pub fn refresh(&mut self, core: &StorageCore) -> Result<()> {
        let notebook = core.find_notebook(self.notebook_local_uid.to_string(), WhichGuid::LocalUid)?;
        self.restrictions.observe(&notebook);

        self.rows = RowOrder::new();
        self.notes.clear();

        let mut offset = 0;
        loop {
            let filter = ListFilter::by_notebook(self.notebook_local_uid);
            let page = core.list_notes(filter, Some(PAGE_SIZE), offset, SortOrder::Natural, SortDirection::Ascending)?;
            if page.is_empty() {
                break;
            }
            let got = page.len() as u32;
            for note in page {
                self.rows.push(note.local_uid);
                self.notes.insert(note.local_uid, note);
            }
            offset += got;
            if got < PAGE_SIZE {
                break;
            }
        }
        self.resort();
        Ok(())
    }

    /// Whether a new note may currently be created in this notebook.
    pub fn can_create_notes(&self) -> bool {
        self.restrictions
            .get(self.notebook_local_uid)
            .map(|r| r.can_create_notes)
            .unwrap_or(true)
    }

    /// Returns a tag's display name, fetching and caching it via `find_tag`
    /// on first reference, per the upstream's on-demand tag-name index.
    pub fn tag_name(&mut self, core: &StorageCore, tag_guid: &Guid) -> Result<String> {
        if let Some(name) = self.tag_names.get(tag_guid) {
            return Ok(name.clone());
        }
        let tag = core.find_tag(tag_guid.as_str(), WhichGuid::RemoteGuid)?;
        self.tag_names.insert(tag_guid.clone(), tag.name.clone());
        Ok(tag.name)
    }

    pub fn sort(&mut self, key: SortKey, direction: SortDirection) {
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
        let notes = &self.notes;
        uids.sort_by(|a, b| {
            let (na, nb) = (&notes[a], &notes[b]);
            let ordering = match self.sort_key {
                SortKey::Type => std::cmp::Ordering::Equal,
                SortKey::DisplayName => na.title.cmp(&nb.title),
                SortKey::NumNotesTargeted => 1u64.cmp(&1u64),
            };
            match self.sort_direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        self.rows.set_order(uids);
    }

    /// Renames a note's title, refusing if the notebook forbids note
    /// updates, and restoring authoritative state on failure.
    pub fn set_display_name(&mut self, core: &StorageCore, local_uid: LocalUid, new_title: String) -> Result<()> {
        if !self
            .restrictions
            .get(self.notebook_local_uid)
            .map(|r| r.can_update_notes)
            .unwrap_or(true)
        {
            return Err(crate::error::StorageCoreError::restriction(
                "notebook forbids updating notes",
            ));
        }
        let result = core.update_note(local_uid, NoteUpdate {
            title: Some(new_title),
            ..Default::default()
        });
        match result {
            Ok(note) => {
                self.notes.insert(local_uid, note);
                self.resort();
                Ok(())
            }
            Err(err) => {
                if let Ok(authoritative) = core.find_note(local_uid.to_string(), WhichGuid::LocalUid) {
                    self.notes.insert(local_uid, authoritative);
                }
                Err(err)
            }
        }
    }

    /// Removes `count` rows starting at display position `first`, deleting
    /// (or expunging) each underlying Note.
    pub fn remove_rows(&mut self, core: &StorageCore, first: usize, count: usize) -> Result<()> {
        let removed = self.rows.remove_range(first, count);
        for uid in removed {
            self.notes.remove(&uid);
            core.delete_note(uid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entity::{NewNote, NewNotebook};
    use tempfile::tempdir;

    #[test]
    fn refresh_loads_notes_scoped_to_notebook() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
            .unwrap();
        let other = core
            .add_notebook(NewNotebook { name: "Other".into(), ..Default::default() })
            .unwrap();
        core.add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "A".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();
        core.add_note(NewNote {
            notebook_local_uid: other.local_uid,
            title: "B".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();

        let mut vm = NotesByNotebookViewModel::new(notebook.local_uid);
        vm.refresh(&core).unwrap();
        assert_eq!(vm.len(), 1);
        assert_eq!(vm.rows()[0].title, "A");
        core.close().unwrap();
    }

    #[test]
    fn restricted_notebook_forbids_create() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook {
                name: "Locked".into(),
                restrictions: crate::entity::NotebookRestrictions {
                    no_create_notes: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        let mut vm = NotesByNotebookViewModel::new(notebook.local_uid);
        vm.refresh(&core).unwrap();
        assert!(!vm.can_create_notes());
        core.close().unwrap();
    }
}
