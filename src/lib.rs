//! # qnote-storage
//!
//! Local-storage core for a personal note-taking client: an embedded,
//! account-scoped SQL store for Notebooks, Notes, Tags, Resources, and
//! SavedSearches, with an in-process cache and a dedicated worker thread so
//! every database access funnels through one place.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qnote_storage::{Config, StorageCore};
//!
//! let core = StorageCore::open("alice", 42, Config::new("./data"))?;
//!
//! let notebook = core.add_notebook(Default::default())?;
//! let note = core.add_note(qnote_storage::NewNote {
//!     notebook_local_uid: notebook.local_uid,
//!     title: "Shopping list".into(),
//!     content: "<en-note>milk, eggs</en-note>".into(),
//!     ..Default::default()
//! })?;
//!
//! core.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Account
//!
//! Each `StorageCore` is opened for one `(username, user_id)` pair and owns a
//! single SQL database file under `Config::data_root`. Multiple accounts on
//! one machine get independent databases. [`StorageCore::switch_user`] closes
//! the current account's connection and opens a different one in place,
//! clearing every cache so no entity from the old account lingers.
//!
//! ### Entities
//!
//! Seven entity families — User, Notebook, SharedNotebook, LinkedNotebook,
//! Note, Tag, Resource, SavedSearch — each with a plain persisted struct, a
//! `New*` struct for creation, and an `*Update` struct for partial edits. See
//! [`entity`].
//!
//! ### Worker & Façade
//!
//! All database access happens on one dedicated thread (`worker`); the
//! [`StorageCore`] façade is the synchronous, thread-safe handle callers use,
//! blocking per call for the worker's reply.
//!
//! ### View-Models
//!
//! [`viewmodel`] holds ordered, sortable projections (Favorites,
//! notes-by-notebook, Tags) intended to back an interactive UI list directly.
//!
//! ## Thread Safety
//!
//! `StorageCore` is `Send + Sync`: every method hops to the single worker
//! thread, so it can be shared across threads (wrap in `Arc` if needed)
//! without any additional locking.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod error;
mod types;

pub mod cache;
pub mod entity;
pub mod facade;
pub mod search;
pub mod storage;
pub mod viewmodel;
pub mod worker;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main entry point
pub use facade::StorageCore;

// Configuration
pub use config::{CacheBounds, Config, SyncMode};

// Error handling
pub use error::{DbError, NotFoundError, Result, StorageCoreError, ValidationError};

// Core types
pub use types::{CorrelationId, Guid, LocalUid, Timestamp, UserId, WhichGuid};

// Entities
pub use entity::{
    Accounting, BusinessUserInfo, DataBody, EntityKind, LinkedNotebook, NewNote, NewNotebook,
    NewResource, NewSavedSearch, NewTag, Note, NoteAttributes, NoteUpdate, Notebook,
    NotebookBusiness, NotebookPublishing, NotebookRestrictions, NotebookUpdate, PremiumInfo,
    Resource, ResourceAttributes, SavedSearch, SavedSearchUpdate, SearchQueryFormat,
    SharedNotebook, Tag, TagUpdate, User, UserAttributes,
};

// Search
pub use search::{ListFilter, SortDirection, SortOrder};

// Storage (for advanced users)
pub use storage::{DatabaseMetadata, SCHEMA_VERSION};

// View-models
pub use viewmodel::{
    FavoriteItem, FavoriteKind, FavoritesViewModel, NotesByNotebookViewModel, SortKey,
    TagsViewModel,
};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common `qnote-storage` usage.
///
/// ```rust
/// use qnote_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::entity::{NewNote, NewNotebook, Note, Notebook};
    pub use crate::error::{Result, StorageCoreError};
    pub use crate::facade::StorageCore;
    pub use crate::search::{ListFilter, SortDirection, SortOrder};
    pub use crate::types::{LocalUid, WhichGuid};
}
