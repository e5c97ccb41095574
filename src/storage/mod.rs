//! Storage layer abstractions for the local-storage core.
//!
//! This module provides a trait-based abstraction over the SQL engine,
//! allowing alternative backends (e.g. a mock for testing) to stand in for
//! the production [`SqliteStorage`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageCore                             │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   StorageEngine     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │         ┌─────────┴──┐   ┌───┴─────────┐                    │
//! │         │SqliteStorage│   │ MockStorage │                    │
//! │         └────────────┘   └─────────────┘                    │
//! │           (prod)           (test)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod schema;
pub mod sqlite;
pub mod transaction;

pub use schema::{DatabaseMetadata, SCHEMA_VERSION};
pub use sqlite::SqliteStorage;
pub use transaction::{Transaction, TransactionMode};

use std::path::Path;

use crate::config::Config;
use crate::entity::{
    LinkedNotebook, NewNote, NewNotebook, NewResource, NewSavedSearch, NewTag, Note, NoteUpdate,
    Notebook, NotebookUpdate, Resource, SavedSearch, SavedSearchUpdate, SharedNotebook, Tag,
    TagUpdate, User,
};
use crate::error::Result;
use crate::search::{ListFilter, SortDirection, SortOrder};
use crate::types::{Guid, LocalUid, WhichGuid};

/// Storage engine trait for the local-storage core.
///
/// This trait defines the contract every backend must implement: one
/// connection tied to an on-disk path, foreign-key enforcement, and
/// insert-or-replace/find/list/delete/expunge per entity family as defined
/// in the component design for the Schema & SQL Engine.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`, though in practice only the async
/// worker's single thread ever calls into one — no internal locking is
/// required or provided.
pub trait StorageEngine: Send + Sync {
    // ---- Lifecycle -------------------------------------------------------

    /// Returns the database metadata (schema version, open time).
    fn metadata(&self) -> &DatabaseMetadata;

    /// Returns the path to the open database file.
    fn path(&self) -> &Path;

    /// Closes the storage engine, consuming it.
    fn close(self: Box<Self>) -> Result<()>;

    // ---- Notebook ----------------------------------------------------------

    /// Returns the number of non-deleted Notebooks.
    fn count_notebooks(&self) -> Result<u64>;
    /// Adds a new Notebook.
    fn add_notebook(&self, new: NewNotebook) -> Result<Notebook>;
    /// Updates an existing Notebook, insert-or-replace by `local_uid`.
    fn update_notebook(&self, local_uid: LocalUid, update: NotebookUpdate) -> Result<Notebook>;
    /// Finds a Notebook by local uid or guid.
    fn find_notebook(&self, key: &str, which: WhichGuid) -> Result<Notebook>;
    /// Lists Notebooks in insertion order (natural ordering per spec §4.1).
    fn list_notebooks(
        &self,
        filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Notebook>>;
    /// Marks a Notebook as deleted, or expunges it if already local-only per
    /// the delete/expunge policy in §4.1 (Notebook has no remote-deletion
    /// privilege, so `delete` is a no-op for non-local rows).
    fn delete_notebook(&self, local_uid: LocalUid) -> Result<()>;
    /// Permanently removes a Notebook; cascades to its Notes.
    fn expunge_notebook(&self, local_uid: LocalUid) -> Result<()>;
    /// Returns the account's default notebook, if one is set.
    fn find_default_notebook(&self) -> Result<Option<Notebook>>;
    /// Returns the account's last-used notebook, if one is set.
    fn find_last_used_notebook(&self) -> Result<Option<Notebook>>;

    // ---- SharedNotebook ------------------------------------------------------

    /// Lists SharedNotebooks for a Notebook, ascending by `index_in_notebook`.
    fn list_shared_notebooks_for_notebook(&self, notebook_guid: &Guid)
        -> Result<Vec<SharedNotebook>>;

    // ---- LinkedNotebook ------------------------------------------------------

    /// Adds or replaces a LinkedNotebook (keyed by guid).
    fn add_linked_notebook(&self, linked: LinkedNotebook) -> Result<LinkedNotebook>;
    /// Finds a LinkedNotebook by guid.
    fn find_linked_notebook(&self, guid: &Guid) -> Result<LinkedNotebook>;
    /// Lists all LinkedNotebooks.
    fn list_linked_notebooks(&self) -> Result<Vec<LinkedNotebook>>;
    /// Permanently removes a LinkedNotebook.
    fn expunge_linked_notebook(&self, guid: &Guid) -> Result<()>;

    // ---- Note -------------------------------------------------------------

    /// Returns the number of non-deleted Notes, optionally scoped to one
    /// notebook or tag (per §D of the generalized `count(kind, filter)`).
    fn count_notes(&self, filter: &ListFilter) -> Result<u64>;
    /// Adds a new Note; validates notebook restrictions (`no_create_notes`).
    fn add_note(&self, new: NewNote) -> Result<Note>;
    /// Updates an existing Note; validates notebook restrictions
    /// (`no_update_notes`) for the target notebook.
    fn update_note(&self, local_uid: LocalUid, update: NoteUpdate) -> Result<Note>;
    /// Finds a Note by local uid or guid, with tags and resources populated.
    fn find_note(&self, key: &str, which: WhichGuid) -> Result<Note>;
    /// Lists Notes matching a filter.
    fn list_notes(
        &self,
        filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Note>>;
    /// Soft-deletes a non-local Note (sets `deletion_timestamp` + `dirty`),
    /// or routes to expunge for a local Note.
    fn delete_note(&self, local_uid: LocalUid) -> Result<()>;
    /// Permanently removes a Note; cascades to its Resources and tag joins.
    fn expunge_note(&self, local_uid: LocalUid) -> Result<()>;

    // ---- Tag ----------------------------------------------------------------

    /// Returns the number of non-deleted Tags.
    fn count_tags(&self) -> Result<u64>;
    /// Adds a new Tag.
    fn add_tag(&self, new: NewTag) -> Result<Tag>;
    /// Updates an existing Tag.
    fn update_tag(&self, local_uid: LocalUid, update: TagUpdate) -> Result<Tag>;
    /// Finds a Tag by local uid or guid.
    fn find_tag(&self, key: &str, which: WhichGuid) -> Result<Tag>;
    /// Lists Tags, alphabetical by `name_upper` (natural ordering per §4.1).
    fn list_tags(
        &self,
        filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Tag>>;
    /// Marks a Tag as deleted (Tag has no remote-deletion privilege).
    fn delete_tag(&self, local_uid: LocalUid) -> Result<()>;
    /// Permanently removes a Tag; cascades to its note-tag join rows.
    fn expunge_tag(&self, local_uid: LocalUid) -> Result<()>;

    // ---- Resource -------------------------------------------------------------

    /// Adds or replaces a Resource, recursively as part of `insert_or_replace`
    /// on its owning Note, or standalone for an attachment added later.
    fn add_resource(&self, new: NewResource) -> Result<Resource>;
    /// Finds a Resource by local uid or guid.
    fn find_resource(
        &self,
        key: &str,
        which: WhichGuid,
        with_binary_body: bool,
    ) -> Result<Resource>;
    /// Lists Resources belonging to a Note, ordered by `index_in_note`.
    fn list_resources_for_note(&self, note_local_uid: LocalUid) -> Result<Vec<Resource>>;
    /// Permanently removes a Resource.
    fn expunge_resource(&self, local_uid: LocalUid) -> Result<()>;

    // ---- SavedSearch ----------------------------------------------------------

    /// Returns the number of SavedSearches.
    fn count_saved_searches(&self) -> Result<u64>;
    /// Adds a new SavedSearch.
    fn add_saved_search(&self, new: NewSavedSearch) -> Result<SavedSearch>;
    /// Updates an existing SavedSearch.
    fn update_saved_search(
        &self,
        local_uid: LocalUid,
        update: SavedSearchUpdate,
    ) -> Result<SavedSearch>;
    /// Finds a SavedSearch by local uid or guid.
    fn find_saved_search(&self, key: &str, which: WhichGuid) -> Result<SavedSearch>;
    /// Lists SavedSearches.
    fn list_saved_searches(
        &self,
        filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<SavedSearch>>;
    /// Permanently removes a SavedSearch.
    fn expunge_saved_search(&self, local_uid: LocalUid) -> Result<()>;

    // ---- User -----------------------------------------------------------------

    /// Adds or replaces a User row.
    fn add_user(&self, user: User) -> Result<User>;
    /// Finds a User by remote id.
    fn find_user(&self, id: i64) -> Result<User>;
    /// Soft-deletes a User; requires `deletion_timestamp` to already be set
    /// on the in-memory value (per §9's preserved upstream behavior).
    fn delete_user(&self, user: User) -> Result<()>;
    /// Permanently removes a User row.
    fn expunge_user(&self, id: i64) -> Result<()>;
}

/// Opens a storage engine at the per-account path derived from
/// `(username, user_id)` under `config.data_root`, creating the directory
/// and database file if missing.
///
/// This is a convenience wrapper around [`SqliteStorage::open`].
pub fn open_storage(
    username: &str,
    user_id: i64,
    config: &Config,
    start_from_scratch: bool,
) -> Result<Box<dyn StorageEngine>> {
    let storage = SqliteStorage::open(username, user_id, config, start_from_scratch)?;
    Ok(Box::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_storage_creates_per_account_directory() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let storage = open_storage("alice", 42, &config, false).unwrap();
        assert!(storage.path().exists());
        storage.close().unwrap();
        assert!(dir.path().join("alice-42").exists());
    }

    #[test]
    fn storage_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteStorage>();
    }
}
