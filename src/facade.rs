//! [`StorageCore`]: the public entry point. A thin façade over the async
//! worker — every method submits a job and blocks for its result, so
//! callers see an ordinary synchronous API while all actual database
//! access funnels through the worker's single thread.

use crate::config::Config;
use crate::entity::{
    LinkedNotebook, NewNote, NewNotebook, NewResource, NewSavedSearch, NewTag, Note, NoteUpdate,
    Notebook, NotebookUpdate, Resource, SavedSearch, SavedSearchUpdate, SharedNotebook, Tag,
    TagUpdate, User,
};
use crate::error::Result;
use crate::search::{ListFilter, SortDirection, SortOrder};
use crate::storage::{DatabaseMetadata, StorageEngine};
use crate::types::{CorrelationId, Guid, LocalUid, WhichGuid};
use crate::worker::{call, call_correlated, Caches, WorkerHandle};

/// The local-storage core for one account.
///
/// Opened with [`StorageCore::open`], closed with [`StorageCore::close`].
/// Cheap to share across threads — clone the handle's `Sender`-backed
/// internals rather than wrapping `StorageCore` itself in an `Arc`, since
/// every method already hops to the single worker thread.
pub struct StorageCore {
    worker: WorkerHandle,
}

impl StorageCore {
    /// Opens (or creates) the per-account database and starts its worker
    /// thread.
    #[tracing::instrument(skip(config))]
    pub fn open(username: &str, user_id: i64, config: Config) -> Result<Self> {
        config.validate()?;
        let worker = WorkerHandle::spawn(username, user_id, &config, false)?;
        Ok(Self { worker })
    }

    /// Opens a fresh database, discarding any existing data at the target
    /// path first.
    pub fn open_from_scratch(username: &str, user_id: i64, config: Config) -> Result<Self> {
        config.validate()?;
        let worker = WorkerHandle::spawn(username, user_id, &config, true)?;
        Ok(Self { worker })
    }

    /// Stops the worker thread, waiting for in-flight jobs to finish.
    pub fn close(self) -> Result<()> {
        self.worker.shutdown();
        Ok(())
    }

    /// Returns the open database's metadata.
    pub fn metadata(&self) -> DatabaseMetadata {
        call(&self.worker, |storage, _| storage.metadata().clone())
    }

    /// Switches this core to a different account: closes the current
    /// database, opens (or creates, if `start_from_scratch`) the target
    /// account's, and drops every cached entity so nothing from the
    /// previous account lingers.
    pub fn switch_user(&self, username: &str, user_id: i64, start_from_scratch: bool) -> Result<()> {
        self.worker.switch_user(username.to_string(), user_id, start_from_scratch)
    }

    /// Submits `f` tagged with a caller-chosen [`CorrelationId`], returning
    /// the value paired with that same id once the worker replies. Every
    /// other method on `StorageCore` is [`call`] with an id of its own
    /// choosing; this is the primitive for a caller that needs to match an
    /// asynchronous outcome back to the request that produced it.
    pub fn call_correlated<T, F>(&self, correlation_id: CorrelationId, f: F) -> (CorrelationId, T)
    where
        T: Send + 'static,
        F: FnOnce(&dyn StorageEngine, &mut Caches) -> T + Send + 'static,
    {
        let reply = call_correlated(&self.worker, correlation_id, f);
        (reply.correlation_id, reply.value)
    }

    // ---- Notebook -----------------------------------------------------

    /// Adds a new Notebook.
    pub fn add_notebook(&self, new: NewNotebook) -> Result<Notebook> {
        call(&self.worker, move |storage, caches| {
            let nb = storage.add_notebook(new)?;
            caches.put_notebook(&nb);
            Ok(nb)
        })
    }

    /// Updates an existing Notebook.
    pub fn update_notebook(&self, local_uid: LocalUid, update: NotebookUpdate) -> Result<Notebook> {
        call(&self.worker, move |storage, caches| {
            let nb = storage.update_notebook(local_uid, update)?;
            caches.put_notebook(&nb);
            Ok(nb)
        })
    }

    /// Finds a Notebook by local uid or guid, consulting the cache first.
    pub fn find_notebook(&self, key: impl Into<String>, which: WhichGuid) -> Result<Notebook> {
        let key = key.into();
        call(&self.worker, move |storage, caches| {
            if let Some(cached) = caches.find_notebook(&key, which) {
                return Ok(cached.clone());
            }
            let nb = storage.find_notebook(&key, which)?;
            caches.put_notebook(&nb);
            Ok(nb)
        })
    }

    /// Lists Notebooks matching `filter`.
    pub fn list_notebooks(
        &self,
        filter: ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Notebook>> {
        call(&self.worker, move |storage, caches| {
            let notebooks = storage.list_notebooks(&filter, limit, offset, order, direction)?;
            for nb in &notebooks {
                caches.put_notebook(nb);
            }
            Ok(notebooks)
        })
    }

    /// Deletes (or, for local-only rows, expunges) a Notebook.
    pub fn delete_notebook(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.delete_notebook(local_uid)?;
            caches.evict_notebook(local_uid);
            Ok(())
        })
    }

    /// Permanently removes a Notebook.
    pub fn expunge_notebook(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.expunge_notebook(local_uid)?;
            caches.evict_notebook(local_uid);
            Ok(())
        })
    }

    /// Returns the account's default notebook, if set.
    pub fn find_default_notebook(&self) -> Result<Option<Notebook>> {
        call(&self.worker, |storage, _| storage.find_default_notebook())
    }

    /// Returns the account's last-used notebook, if set.
    pub fn find_last_used_notebook(&self) -> Result<Option<Notebook>> {
        call(&self.worker, |storage, _| storage.find_last_used_notebook())
    }

    // ---- SharedNotebook -------------------------------------------------

    /// Lists SharedNotebooks for a Notebook.
    pub fn list_shared_notebooks_for_notebook(&self, notebook_guid: Guid) -> Result<Vec<SharedNotebook>> {
        call(&self.worker, move |storage, _| {
            storage.list_shared_notebooks_for_notebook(&notebook_guid)
        })
    }

    // ---- LinkedNotebook -------------------------------------------------

    /// Adds or replaces a LinkedNotebook.
    pub fn add_linked_notebook(&self, linked: LinkedNotebook) -> Result<LinkedNotebook> {
        call(&self.worker, move |storage, _| storage.add_linked_notebook(linked))
    }

    /// Finds a LinkedNotebook by guid.
    pub fn find_linked_notebook(&self, guid: Guid) -> Result<LinkedNotebook> {
        call(&self.worker, move |storage, _| storage.find_linked_notebook(&guid))
    }

    /// Lists all LinkedNotebooks.
    pub fn list_linked_notebooks(&self) -> Result<Vec<LinkedNotebook>> {
        call(&self.worker, |storage, _| storage.list_linked_notebooks())
    }

    /// Permanently removes a LinkedNotebook.
    pub fn expunge_linked_notebook(&self, guid: Guid) -> Result<()> {
        call(&self.worker, move |storage, _| storage.expunge_linked_notebook(&guid))
    }

    // ---- Note -----------------------------------------------------------

    /// Returns the number of non-deleted Notes matching `filter`.
    pub fn count_notes(&self, filter: ListFilter) -> Result<u64> {
        call(&self.worker, move |storage, _| storage.count_notes(&filter))
    }

    /// Adds a new Note.
    pub fn add_note(&self, new: NewNote) -> Result<Note> {
        call(&self.worker, move |storage, caches| {
            let note = storage.add_note(new)?;
            caches.put_note(&note);
            Ok(note)
        })
    }

    /// Updates an existing Note.
    pub fn update_note(&self, local_uid: LocalUid, update: NoteUpdate) -> Result<Note> {
        call(&self.worker, move |storage, caches| {
            let note = storage.update_note(local_uid, update)?;
            caches.put_note(&note);
            Ok(note)
        })
    }

    /// Finds a Note by local uid or guid, consulting the cache first.
    pub fn find_note(&self, key: impl Into<String>, which: WhichGuid) -> Result<Note> {
        let key = key.into();
        call(&self.worker, move |storage, caches| {
            if let Some(cached) = caches.find_note(&key, which) {
                return Ok(cached.clone());
            }
            let note = storage.find_note(&key, which)?;
            caches.put_note(&note);
            Ok(note)
        })
    }

    /// Lists Notes matching `filter`.
    pub fn list_notes(
        &self,
        filter: ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Note>> {
        call(&self.worker, move |storage, caches| {
            let notes = storage.list_notes(&filter, limit, offset, order, direction)?;
            for note in &notes {
                caches.put_note(note);
            }
            Ok(notes)
        })
    }

    /// Deletes (or expunges) a Note.
    pub fn delete_note(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.delete_note(local_uid)?;
            caches.evict_note(local_uid);
            Ok(())
        })
    }

    /// Permanently removes a Note.
    pub fn expunge_note(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.expunge_note(local_uid)?;
            caches.evict_note(local_uid);
            Ok(())
        })
    }

    // ---- Tag --------------------------------------------------------------

    /// Adds a new Tag.
    pub fn add_tag(&self, new: NewTag) -> Result<Tag> {
        call(&self.worker, move |storage, caches| {
            let tag = storage.add_tag(new)?;
            caches.put_tag(&tag);
            Ok(tag)
        })
    }

    /// Updates an existing Tag.
    pub fn update_tag(&self, local_uid: LocalUid, update: TagUpdate) -> Result<Tag> {
        call(&self.worker, move |storage, caches| {
            let tag = storage.update_tag(local_uid, update)?;
            caches.put_tag(&tag);
            Ok(tag)
        })
    }

    /// Finds a Tag by local uid or guid, consulting the cache first.
    pub fn find_tag(&self, key: impl Into<String>, which: WhichGuid) -> Result<Tag> {
        let key = key.into();
        call(&self.worker, move |storage, caches| {
            if let Some(cached) = caches.find_tag(&key, which) {
                return Ok(cached.clone());
            }
            let tag = storage.find_tag(&key, which)?;
            caches.put_tag(&tag);
            Ok(tag)
        })
    }

    /// Lists Tags matching `filter`.
    pub fn list_tags(
        &self,
        filter: ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Tag>> {
        call(&self.worker, move |storage, caches| {
            let tags = storage.list_tags(&filter, limit, offset, order, direction)?;
            for tag in &tags {
                caches.put_tag(tag);
            }
            Ok(tags)
        })
    }

    /// Marks a Tag deleted.
    pub fn delete_tag(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.delete_tag(local_uid)?;
            caches.evict_tag(local_uid);
            Ok(())
        })
    }

    /// Permanently removes a Tag.
    pub fn expunge_tag(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, caches| {
            storage.expunge_tag(local_uid)?;
            caches.evict_tag(local_uid);
            Ok(())
        })
    }

    // ---- Resource -----------------------------------------------------------

    /// Attaches a new Resource to a Note.
    pub fn add_resource(&self, new: NewResource) -> Result<Resource> {
        call(&self.worker, move |storage, _| storage.add_resource(new))
    }

    /// Finds a Resource by local uid or guid.
    pub fn find_resource(
        &self,
        key: impl Into<String>,
        which: WhichGuid,
        with_binary_body: bool,
    ) -> Result<Resource> {
        let key = key.into();
        call(&self.worker, move |storage, _| {
            storage.find_resource(&key, which, with_binary_body)
        })
    }

    /// Lists Resources belonging to a Note.
    pub fn list_resources_for_note(&self, note_local_uid: LocalUid) -> Result<Vec<Resource>> {
        call(&self.worker, move |storage, _| {
            storage.list_resources_for_note(note_local_uid)
        })
    }

    /// Permanently removes a Resource.
    pub fn expunge_resource(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, _| storage.expunge_resource(local_uid))
    }

    // ---- SavedSearch --------------------------------------------------------

    /// Adds a new SavedSearch.
    pub fn add_saved_search(&self, new: NewSavedSearch) -> Result<SavedSearch> {
        call(&self.worker, move |storage, _| storage.add_saved_search(new))
    }

    /// Updates an existing SavedSearch.
    pub fn update_saved_search(
        &self,
        local_uid: LocalUid,
        update: SavedSearchUpdate,
    ) -> Result<SavedSearch> {
        call(&self.worker, move |storage, _| {
            storage.update_saved_search(local_uid, update)
        })
    }

    /// Finds a SavedSearch by local uid or guid.
    pub fn find_saved_search(&self, key: impl Into<String>, which: WhichGuid) -> Result<SavedSearch> {
        let key = key.into();
        call(&self.worker, move |storage, _| storage.find_saved_search(&key, which))
    }

    /// Lists SavedSearches matching `filter`.
    pub fn list_saved_searches(
        &self,
        filter: ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<SavedSearch>> {
        call(&self.worker, move |storage, _| {
            storage.list_saved_searches(&filter, limit, offset, order, direction)
        })
    }

    /// Permanently removes a SavedSearch.
    pub fn expunge_saved_search(&self, local_uid: LocalUid) -> Result<()> {
        call(&self.worker, move |storage, _| storage.expunge_saved_search(local_uid))
    }

    // ---- User -----------------------------------------------------------------

    /// Adds or replaces a User row.
    pub fn add_user(&self, user: User) -> Result<User> {
        call(&self.worker, move |storage, _| storage.add_user(user))
    }

    /// Finds a User by remote id.
    pub fn find_user(&self, id: i64) -> Result<User> {
        call(&self.worker, move |storage, _| storage.find_user(id))
    }

    /// Soft-deletes a User.
    pub fn delete_user(&self, user: User) -> Result<()> {
        call(&self.worker, move |storage, _| storage.delete_user(user))
    }

    /// Permanently removes a User row.
    pub fn expunge_user(&self, id: i64) -> Result<()> {
        call(&self.worker, move |storage, _| storage.expunge_user(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_add_find_close_roundtrips() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let created = core
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                ..Default::default()
            })
            .unwrap();
        let found = core
            .find_notebook(created.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap();
        assert_eq!(found.name, "Inbox");
        core.close().unwrap();
    }

    #[test]
    fn note_lifecycle_through_facade() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let notebook = core
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                ..Default::default()
            })
            .unwrap();
        let note = core
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "Hello".into(),
                content: "<en-note>hi</en-note>".into(),
                ..Default::default()
            })
            .unwrap();
        core.delete_note(note.local_uid).unwrap();
        let err = core
            .find_note(note.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap_err();
        assert!(err.is_not_found());
        core.close().unwrap();
    }

    #[test]
    fn call_correlated_echoes_the_request_id() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        let sent = crate::types::CorrelationId::new();
        let (echoed, count) = core.call_correlated(sent, |storage, _| storage.count_notebooks().unwrap());
        assert_eq!(echoed, sent);
        assert_eq!(count, 0);
        core.close().unwrap();
    }

    #[test]
    fn switch_user_isolates_the_new_account_from_the_old() {
        let dir = tempdir().unwrap();
        let core = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
        core.add_notebook(NewNotebook { name: "Alice's".into(), ..Default::default() })
            .unwrap();

        core.switch_user("bob", 2, false).unwrap();
        let bob_notebooks = core
            .list_notebooks(ListFilter::all(), None, 0, SortOrder::Natural, SortDirection::Ascending)
            .unwrap();
        assert!(bob_notebooks.is_empty());

        core.switch_user("alice", 1, false).unwrap();
        let alice_notebooks = core
            .list_notebooks(ListFilter::all(), None, 0, SortOrder::Natural, SortDirection::Ascending)
            .unwrap();
        assert_eq!(alice_notebooks.len(), 1);
        core.close().unwrap();
    }
}
