//! The SavedSearch entity: a named, persisted search query.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Guid, LocalUid};

/// Query-language dialect a SavedSearch is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchQueryFormat {
    /// The service's own user-facing search grammar.
    UserQuery,
    /// A raw SQL-like expression (service-internal use only).
    Sexp,
}

/// A SavedSearch: a named, persisted search query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    /// Locally-assigned, stable identifier.
    pub local_uid: LocalUid,
    /// Remote identifier, present once synchronized.
    pub guid: Option<Guid>,
    /// Display name; unique case-insensitive within the account.
    pub name: String,
    /// Case-folded `name`, used for the unique-name index.
    pub name_upper: String,
    /// The search query string.
    pub query: String,
    /// Dialect `query` is expressed in.
    pub format: SearchQueryFormat,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Whether the search should also scope over the account's own notes.
    pub include_account: bool,
    /// Whether the search should also scope over personal linked notebooks.
    pub include_personal_linked_notebooks: bool,
    /// Whether the search should also scope over business linked notebooks.
    pub include_business_linked_notebooks: bool,
    /// User-flagged for quick access.
    pub favorited: bool,
    /// Has local changes not yet pushed remotely.
    pub dirty: bool,
    /// Never sent remotely; required true for `expunge`.
    pub is_local: bool,
}

impl SavedSearch {
    /// Validates field-level invariants. Uniqueness of `name_upper` is
    /// checked against the database, not here.
    pub fn check_parameters(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required_field("name"));
        }
        if self.query.trim().is_empty() {
            return Err(ValidationError::required_field("query"));
        }
        Ok(())
    }
}

/// Fields supplied by a caller creating a new SavedSearch.
#[derive(Clone, Debug, Default)]
pub struct NewSavedSearch {
    /// Remote identifier, if already known.
    pub guid: Option<Guid>,
    /// Display name.
    pub name: String,
    /// The search query string.
    pub query: String,
    /// Scope flags; default all three to false.
    pub include_account: bool,
    /// See [`NewSavedSearch::include_account`].
    pub include_personal_linked_notebooks: bool,
    /// See [`NewSavedSearch::include_account`].
    pub include_business_linked_notebooks: bool,
}

/// Partial update to an existing SavedSearch.
#[derive(Clone, Debug, Default)]
pub struct SavedSearchUpdate {
    /// New display name, if renaming.
    pub name: Option<String>,
    /// New query string, if changing.
    pub query: Option<String>,
    /// New favorited flag.
    pub favorited: Option<bool>,
}
