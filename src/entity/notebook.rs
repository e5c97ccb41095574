//! The Notebook entity: a named container for Notes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Guid, LocalUid, Timestamp};

/// A boolean matrix limiting which operations callers may perform on a
/// Notebook and on its Notes/Tags. Server-supplied; the core only records
/// and enforces it, never derives it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookRestrictions {
    /// Notes may not be read from this notebook.
    pub no_read_notes: bool,
    /// Notes may not be created in this notebook.
    pub no_create_notes: bool,
    /// Existing notes in this notebook may not be updated.
    pub no_update_notes: bool,
    /// Notes in this notebook may not be expunged.
    pub no_expunge_notes: bool,
    /// Notes in this notebook may not be shared.
    pub no_share_notes: bool,
    /// The notebook itself may not be renamed.
    pub no_rename_notebook: bool,
    /// The notebook itself may not be updated.
    pub no_update_notebook: bool,
    /// The notebook may not be expunged.
    pub no_expunge_notebook: bool,
    /// Tags may not be created within this notebook's scope.
    pub no_create_tags: bool,
    /// Tags within this notebook's scope may not be updated.
    pub no_update_tags: bool,
    /// Tags within this notebook's scope may not be expunged.
    pub no_expunge_tags: bool,
    /// Notes in this notebook may not be set inactive.
    pub no_set_default_notebook: bool,
    /// The notebook may not be published.
    pub no_publish_to_public: bool,
    /// Business-shared notebook may not be sent to its business.
    pub no_send_to_business: bool,
}

/// The notebook's publishing configuration, present only if the notebook
/// has been published to the public.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotebookPublishing {
    /// Public URI slug.
    pub uri: Option<String>,
    /// Order notes are shown in on the public page.
    pub order: Option<i32>,
    /// Whether notes are shown ascending by the order field.
    pub ascending: Option<bool>,
    /// Public display name for the publisher.
    pub public_description: Option<String>,
}

/// Business-notebook metadata, present only for notebooks owned by a
/// business account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotebookBusiness {
    /// Notebook description visible to the business.
    pub notebook_description: Option<String>,
    /// Privilege required to view this business notebook.
    pub required_privilege: Option<i32>,
}

/// A Notebook: a named container for Notes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Locally-assigned, stable identifier.
    pub local_uid: LocalUid,
    /// Remote identifier, present once synchronized.
    pub guid: Option<Guid>,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Display name; unique case-insensitive within the account.
    pub name: String,
    /// Creation time.
    pub creation_timestamp: Option<Timestamp>,
    /// Last-modification time.
    pub modification_timestamp: Option<Timestamp>,
    /// At most one notebook in the account has this set.
    pub is_default: bool,
    /// At most one notebook in the account has this set.
    pub is_last_used: bool,
    /// Optional named stack this notebook belongs to, for grouping.
    pub stack: Option<String>,
    /// Present once the notebook has been published.
    pub publishing: Option<NotebookPublishing>,
    /// Present for business-shared notebooks.
    pub business: Option<NotebookBusiness>,
    /// User id of the notebook's contact, for business-shared notebooks.
    pub contact_user_id: Option<i64>,
    /// Permission matrix.
    pub restrictions: NotebookRestrictions,
    /// Has local changes not yet pushed remotely.
    pub dirty: bool,
    /// Never sent remotely; required true for `expunge`.
    pub is_local: bool,
}

/// Fields supplied by a caller creating a new Notebook.
#[derive(Clone, Debug, Default)]
pub struct NewNotebook {
    /// Remote identifier, if already known (e.g. created during sync).
    pub guid: Option<Guid>,
    /// Display name.
    pub name: String,
    /// Whether this should become the account's default notebook.
    pub is_default: bool,
    /// Optional stack name.
    pub stack: Option<String>,
    /// Permission matrix; defaults to fully permissive.
    pub restrictions: NotebookRestrictions,
}

/// Partial update to an existing Notebook. `None` fields are left
/// unchanged; this is distinct from clearing a field, which requires
/// `Some(None)` where the underlying field is itself optional.
#[derive(Clone, Debug, Default)]
pub struct NotebookUpdate {
    /// New display name, if renaming.
    pub name: Option<String>,
    /// New default-notebook flag.
    pub is_default: Option<bool>,
    /// New last-used-notebook flag.
    pub is_last_used: Option<bool>,
    /// New stack assignment; `Some(None)` clears the stack.
    pub stack: Option<Option<String>>,
    /// New restriction matrix.
    pub restrictions: Option<NotebookRestrictions>,
}

impl Notebook {
    /// Validates field-level invariants before `add`/`update` persist the
    /// notebook. Uniqueness (name, `is_default`, `is_last_used`) is checked
    /// against the database, not here.
    pub fn check_parameters(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required_field("name"));
        }
        if self.name.len() > 255 {
            return Err(ValidationError::invalid_field(
                "name",
                "must be 255 characters or fewer",
            ));
        }
        Ok(())
    }

    /// Case-folded name used for the unique-name index and lookups.
    pub fn name_upper(&self) -> String {
        self.name.to_uppercase()
    }
}
