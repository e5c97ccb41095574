//! Error types for the local-storage core.
//!
//! The crate uses a hierarchical error system:
//! - [`StorageCoreError`] is the top-level error returned by all public APIs.
//! - [`DbError`], [`ValidationError`], [`NotFoundError`] provide detail and
//!   map directly onto the kinds in the error taxonomy (DatabaseOpen,
//!   DatabaseSql, InvalidEntity, NotFound, Conflict, Restriction,
//!   ExpungePolicy, InvariantViolation).
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use qnote_storage::{Config, Result, StorageCore};
//!
//! fn example() -> Result<()> {
//!     let core = StorageCore::open("alice", 42, "./data", Config::default())?;
//!     // ... operations that may fail ...
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storage-core operations.
pub type Result<T> = std::result::Result<T, StorageCoreError>;

/// Top-level error enum for all storage-core operations.
///
/// This is the only error type returned by public APIs. Use pattern
/// matching (or the `is_*` helpers) to handle specific cases.
#[derive(Debug, Error)]
pub enum StorageCoreError {
    /// Database-layer error (open, SQL, transaction control).
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Input validation error (`check_parameters` failed).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Add/rename would duplicate an existing row by guid or unique name.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Notebook restrictions forbid the requested operation.
    #[error("Restriction: {0}")]
    Restriction(String),

    /// Attempted to expunge a non-local entity, or delete a non-deletable one.
    #[error("Expunge policy violation: {0}")]
    ExpungePolicy(String),

    /// Internal bug — an invariant the core itself is responsible for
    /// upholding was violated. Logged at error severity by callers.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// General I/O error (directory creation, file truncation).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageCoreError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates a conflict error with the given reason.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    /// Creates a restriction error with the given reason.
    pub fn restriction(reason: impl Into<String>) -> Self {
        Self::Restriction(reason.into())
    }

    /// Creates an expunge-policy error with the given reason.
    pub fn expunge_policy(reason: impl Into<String>) -> Self {
        Self::ExpungePolicy(reason.into())
    }

    /// Creates an invariant-violation error with the given reason.
    pub fn invariant_violation(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a database error.
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns true if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if this is a restriction error.
    pub fn is_restriction(&self) -> bool {
        matches!(self, Self::Restriction(_))
    }
}

/// Database-layer errors (the `DatabaseOpen` and `DatabaseSql` kinds).
#[derive(Debug, Error)]
pub enum DbError {
    /// Could not create the per-account directory, open the database file,
    /// or locate a supported driver.
    #[error("Could not open database at {path}: {reason}")]
    Open {
        /// Path the core tried to open.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A SQL statement failed; carries the statement and the driver message.
    #[error("SQL statement failed: {statement}: {reason}")]
    Sql {
        /// The failing SQL statement (or a short description of it).
        statement: String,
        /// The underlying driver message.
        reason: String,
    },

    /// Transaction control (BEGIN/COMMIT/ROLLBACK/END) failed; fatal to the
    /// current request.
    #[error("Transaction control failed: {0}")]
    Transaction(String),

    /// The on-disk schema version is newer than this build understands.
    #[error("Schema version mismatch: expected <= {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Highest schema version this build understands.
        expected: u32,
        /// Actual schema version found in the database.
        found: u32,
    },
}

impl DbError {
    /// Creates an open error.
    pub fn open(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a SQL error.
    pub fn sql(statement: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sql {
            statement: statement.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transaction error.
    pub fn transaction(reason: impl Into<String>) -> Self {
        Self::Transaction(reason.into())
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::sql("<unlabeled statement>", err.to_string())
    }
}

impl From<rusqlite::Error> for StorageCoreError {
    fn from(err: rusqlite::Error) -> Self {
        StorageCoreError::Database(DbError::from(err))
    }
}

/// Validation errors for caller-provided data (`InvalidEntity` kind).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },

    /// Content exceeds a maximum allowed size.
    #[error("Content too large: {size} bytes (max: {max} bytes)")]
    ContentTooLarge {
        /// Actual content size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Too many items in a collection field.
    #[error("Too many items in '{field}': {count} (max: {max})")]
    TooManyItems {
        /// Name of the field.
        field: String,
        /// Actual count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }

    /// Creates a content-too-large error.
    pub fn content_too_large(size: usize, max: usize) -> Self {
        Self::ContentTooLarge { size, max }
    }

    /// Creates a too-many-items error.
    pub fn too_many_items(field: impl Into<String>, count: usize, max: usize) -> Self {
        Self::TooManyItems {
            field: field.into(),
            count,
            max,
        }
    }
}

/// Not-found errors for specific entity types (`NotFound` kind).
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// User with given id not found.
    #[error("User not found: {0}")]
    User(String),
    /// Notebook with given key not found.
    #[error("Notebook not found: {0}")]
    Notebook(String),
    /// SharedNotebook with given key not found.
    #[error("Shared notebook not found: {0}")]
    SharedNotebook(String),
    /// LinkedNotebook with given guid not found.
    #[error("Linked notebook not found: {0}")]
    LinkedNotebook(String),
    /// Note with given key not found.
    #[error("Note not found: {0}")]
    Note(String),
    /// Tag with given key not found.
    #[error("Tag not found: {0}")]
    Tag(String),
    /// Resource with given key not found.
    #[error("Resource not found: {0}")]
    Resource(String),
    /// SavedSearch with given key not found.
    #[error("Saved search not found: {0}")]
    SavedSearch(String),
}

impl NotFoundError {
    /// Creates a user-not-found error.
    pub fn user(id: impl ToString) -> Self {
        Self::User(id.to_string())
    }
    /// Creates a notebook-not-found error.
    pub fn notebook(key: impl ToString) -> Self {
        Self::Notebook(key.to_string())
    }
    /// Creates a shared-notebook-not-found error.
    pub fn shared_notebook(key: impl ToString) -> Self {
        Self::SharedNotebook(key.to_string())
    }
    /// Creates a linked-notebook-not-found error.
    pub fn linked_notebook(key: impl ToString) -> Self {
        Self::LinkedNotebook(key.to_string())
    }
    /// Creates a note-not-found error.
    pub fn note(key: impl ToString) -> Self {
        Self::Note(key.to_string())
    }
    /// Creates a tag-not-found error.
    pub fn tag(key: impl ToString) -> Self {
        Self::Tag(key.to_string())
    }
    /// Creates a resource-not-found error.
    pub fn resource(key: impl ToString) -> Self {
        Self::Resource(key.to_string())
    }
    /// Creates a saved-search-not-found error.
    pub fn saved_search(key: impl ToString) -> Self {
        Self::SavedSearch(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = StorageCoreError::config("missing root directory");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing root directory"
        );
    }

    #[test]
    fn schema_version_mismatch_display() {
        let err = DbError::SchemaVersionMismatch {
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "Schema version mismatch: expected <= 2, found 3"
        );
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::invalid_field("name", "must not be empty");
        assert_eq!(err.to_string(), "Invalid field 'name': must not be empty");
    }

    #[test]
    fn not_found_error_display() {
        let err = NotFoundError::notebook("abc-123");
        assert_eq!(err.to_string(), "Notebook not found: abc-123");
    }

    #[test]
    fn is_not_found_roundtrip() {
        let err: StorageCoreError = NotFoundError::note("n1").into();
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn is_validation_roundtrip() {
        let err: StorageCoreError = ValidationError::required_field("title").into();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn conflict_and_restriction_helpers() {
        assert!(StorageCoreError::conflict("duplicate name").is_conflict());
        assert!(StorageCoreError::restriction("no_create_notes").is_restriction());
    }

    #[test]
    fn error_conversion_chain() {
        fn inner() -> Result<()> {
            Err(DbError::transaction("commit failed"))?
        }
        let result = inner();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_database());
    }
}
