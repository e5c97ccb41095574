//! Generic listing filter shared by every entity family's `list` operation.
//!
//! The upstream source has one `list_all_…_per_…` method per entity family
//! and scope combination; a single filter struct plus a generic
//! `list<E>(filter, limit, offset, order, direction)` signature collapses
//! all of them, since the many signatures are a language-level artifact
//! rather than a semantic distinction.

use crate::types::{Guid, LocalUid};

/// Filter criteria for a `list`/`count` call against any entity family.
/// Fields set to `None`/`false` are not filtered on; fields that don't apply
/// to a given entity family are simply ignored by that family's listing.
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    /// Scope Notes to one Notebook.
    pub notebook_local_uid: Option<LocalUid>,
    /// Scope Notes to those tagged with this Tag guid.
    pub tag_guid: Option<Guid>,
    /// Include soft-deleted rows that would otherwise be hidden from
    /// default listings.
    pub include_deleted: bool,
    /// Only include favorited entities.
    pub favorited_only: bool,
}

impl ListFilter {
    /// A filter matching everything non-deleted, non-favorited-only.
    pub fn all() -> Self {
        Self::default()
    }

    /// Scopes a Note listing/count to one Notebook.
    pub fn by_notebook(notebook_local_uid: LocalUid) -> Self {
        Self {
            notebook_local_uid: Some(notebook_local_uid),
            ..Self::default()
        }
    }

    /// Scopes a Note listing/count to one Tag.
    pub fn by_tag(tag_guid: Guid) -> Self {
        Self {
            tag_guid: Some(tag_guid),
            ..Self::default()
        }
    }
}

/// Sort key for a `list` call. Which variants are meaningful depends on the
/// entity family; an entity family ignores a key that doesn't apply to it
/// and falls back to its natural ordering (insertion order for Notebooks,
/// alphabetical by `name_upper` for Tags, per §4.1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// The entity family's natural ordering.
    #[default]
    Natural,
    /// Sort by title/name.
    Title,
    /// Sort by creation timestamp.
    CreatedAt,
    /// Sort by modification timestamp.
    UpdatedAt,
}

/// Sort direction for a `list` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest/earliest first.
    #[default]
    Ascending,
    /// Largest/latest first.
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_notebook_sets_only_that_field() {
        let uid = LocalUid::new();
        let filter = ListFilter::by_notebook(uid);
        assert_eq!(filter.notebook_local_uid, Some(uid));
        assert!(filter.tag_guid.is_none());
    }

    #[test]
    fn defaults_are_unfiltered() {
        let filter = ListFilter::all();
        assert!(!filter.include_deleted);
        assert!(!filter.favorited_only);
    }
}
