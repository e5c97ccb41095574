//! The Tags view-model: an ordered, sortable projection of every Tag, each
//! row annotated with the number of Notes it targets.
//!
//! Generalizes the favorites worked example (spec §4.7) to the full Tag
//! list, grounded on the upstream `TagModel`.

use std::collections::HashMap;

use crate::entity::{Tag, TagUpdate};
use crate::error::Result;
use crate::facade::StorageCore;
use crate::search::{ListFilter, SortDirection, SortOrder};
use crate::types::{Guid, LocalUid, WhichGuid};

use super::{RowOrder, SortKey};

const PAGE_SIZE: u32 = 40;

/// One row of the tags projection: a Tag plus its cached targeted-note count.
#[derive(Clone, Debug, PartialEq)]
pub struct TagRow {
    pub tag: Tag,
    pub target_note_count: u64,
}

/// Ordered, sortable projection of every Tag.
pub struct TagsViewModel {
    rows: RowOrder,
    items: HashMap<LocalUid, TagRow>,
    sort_key: SortKey,
    sort_direction: SortDirection,
}

impl TagsViewModel {
    pub fn new() -> Self {
        Self {
            rows: RowOrder::new(),
            items: HashMap::new(),
            sort_key: SortKey::DisplayName,
            sort_direction: SortDirection::Ascending,
        }
    }

    pub fn rows(&self) -> Vec<&TagRow> {
        self.rows.iter().filter_map(|uid| self.items.get(&uid)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.len() == 0
    }

    /// Reloads every non-deleted Tag, paginating `PAGE_SIZE` at a time, and
    /// recomputes each row's targeted-note count via a `count_notes` request
    /// scoped by tag guid.
    pub fn refresh(&mut self, core: &StorageCore) -> Result<()> {
        self.rows = RowOrder::new();
        self.items.clear();

        let mut offset = 0;
        loop {
            let page = core.list_tags(ListFilter::all(), Some(PAGE_SIZE), offset, SortOrder::Natural, SortDirection::Ascending)?;
            if page.is_empty() {
                break;
            }
            let got = page.len() as u32;
            for tag in page {
                let target_note_count = self.note_count_for(core, &tag)?;
                self.rows.push(tag.local_uid);
                self.items.insert(tag.local_uid, TagRow { tag, target_note_count });
            }
            offset += got;
            if got < PAGE_SIZE {
                break;
            }
        }
        self.resort();
        Ok(())
    }

    fn note_count_for(&self, core: &StorageCore, tag: &Tag) -> Result<u64> {
        match &tag.guid {
            Some(guid) => core.count_notes(ListFilter::by_tag(guid.clone())),
            None => Ok(0),
        }
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
        let items = &self.items;
        uids.sort_by(|a, b| {
            let (ra, rb) = (&items[a], &items[b]);
            let ordering = match self.sort_key {
                SortKey::Type => std::cmp::Ordering::Equal,
                SortKey::DisplayName => ra.tag.name_upper.cmp(&rb.tag.name_upper),
                SortKey::NumNotesTargeted => ra.target_note_count.cmp(&rb.target_note_count),
            };
            match self.sort_direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        self.rows.set_order(uids);
    }

    /// Renames a Tag, restoring authoritative state on failure.
    pub fn set_display_name(&mut self, core: &StorageCore, local_uid: LocalUid, new_name: String) -> Result<()> {
        let result = core.update_tag(local_uid, TagUpdate {
            name: Some(new_name),
            ..Default::default()
        });
        match result {
            Ok(tag) => {
                if let Some(row) = self.items.get_mut(&local_uid) {
                    row.tag = tag;
                }
                self.resort();
                Ok(())
            }
            Err(err) => {
                if let Ok(authoritative) = core.find_tag(local_uid.to_string(), WhichGuid::LocalUid) {
                    if let Some(row) = self.items.get_mut(&local_uid) {
                        row.tag = authoritative;
                    }
                }
                Err(err)
            }
        }
    }

    /// Returns the guid of the tag at `local_uid`, if known, for the
    /// notes-by-notebook view-model's on-demand tag-name index to resolve
    /// against without a second round trip.
    pub fn guid_of(&self, local_uid: LocalUid) -> Option<&Guid> {
        self.items.get(&local_uid)?.tag.guid.as_ref()
    }

    /// Removes `count` rows starting at display position `first`, deleting
    /// each underlying Tag.
    pub fn remove_rows(&mut self, core: &StorageCore, first: usize, count: usize) -> Result<()> {
        let removed = self.rows.remove_range(first, count);
        for uid in removed {
            self.items.remove(&uid);
            core.delete_tag(uid)?;
        }
        Ok(())
    }
}

impl Default for TagsViewModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::entity::NewTag;
    use tempfile::tempdir;

    #[test]
    fn refresh_loads_tags_sorted_by_name() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        core.add_tag(NewTag { name: "Zebra".into(), ..Default::default() }).unwrap();
        core.add_tag(NewTag { name: "Apple".into(), ..Default::default() }).unwrap();

        let mut vm = TagsViewModel::new();
        vm.refresh(&core).unwrap();
        let names: Vec<&str> = vm.rows().iter().map(|r| r.tag.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Zebra"]);
        core.close().unwrap();
    }

    #[test]
    fn remove_rows_deletes_underlying_tags() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let tag = core.add_tag(NewTag { name: "Solo".into(), ..Default::default() }).unwrap();

        let mut vm = TagsViewModel::new();
        vm.refresh(&core).unwrap();
        assert_eq!(vm.len(), 1);
        vm.remove_rows(&core, 0, 1).unwrap();
        assert_eq!(vm.len(), 0);

        // Tag deletion is a soft delete (§4.1: tags have no remote-deletion
        // privilege), so the row still exists, marked deleted.
        let deleted = core.find_tag(tag.local_uid.to_string(), WhichGuid::LocalUid).unwrap();
        assert!(deleted.is_deleted);
        core.close().unwrap();
    }
}
