//! Value types for every entity family the local-storage core persists.
//!
//! Each submodule follows the same shape: a plain data struct for the
//! persisted entity, a `New*` struct for the fields a caller supplies on
//! creation, an `*Update` struct for partial updates, and a
//! `check_parameters` validation function consulted by `add`/`update`
//! before anything touches SQL.

pub mod linked_notebook;
pub mod note;
pub mod notebook;
pub mod resource;
pub mod saved_search;
pub mod shared_notebook;
pub mod tag;
pub mod user;

pub use linked_notebook::LinkedNotebook;
pub use note::{Note, NoteAttributes, NoteUpdate, NewNote};
pub use notebook::{
    NewNotebook, Notebook, NotebookBusiness, NotebookPublishing, NotebookRestrictions,
    NotebookUpdate,
};
pub use resource::{DataBody, NewResource, Resource, ResourceAttributes};
pub use saved_search::{NewSavedSearch, SavedSearch, SavedSearchUpdate, SearchQueryFormat};
pub use shared_notebook::SharedNotebook;
pub use tag::{NewTag, Tag, TagUpdate};
pub use user::{Accounting, BusinessUserInfo, PremiumInfo, User, UserAttributes};

/// Tags a value or a request with the entity family it concerns. Used by
/// the cache, the worker's request/response enums, and the view-model to
/// avoid one hand-written signature per entity type (see `list<E>`
/// discussion for the async worker).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A [`User`] row.
    User,
    /// A [`Notebook`] row.
    Notebook,
    /// A [`SharedNotebook`] row.
    SharedNotebook,
    /// A [`LinkedNotebook`] row.
    LinkedNotebook,
    /// A [`Note`] row.
    Note,
    /// A [`Tag`] row.
    Tag,
    /// A [`Resource`] row.
    Resource,
    /// A [`SavedSearch`] row.
    SavedSearch,
}

impl EntityKind {
    /// Returns the lower-case name used in log lines and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Notebook => "notebook",
            Self::SharedNotebook => "shared_notebook",
            Self::LinkedNotebook => "linked_notebook",
            Self::Note => "note",
            Self::Tag => "tag",
            Self::Resource => "resource",
            Self::SavedSearch => "saved_search",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
