//! The Tag entity: a label applied to zero or more Notes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Guid, LocalUid};

/// A Tag: a label applicable to Notes, optionally nested under a parent tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Locally-assigned, stable identifier.
    pub local_uid: LocalUid,
    /// Remote identifier, present once synchronized.
    pub guid: Option<Guid>,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Display name.
    pub name: String,
    /// Case-folded `name`, used for the unique-name index and for
    /// alphabetical listing order.
    pub name_upper: String,
    /// Guid of a parent tag, if this tag is nested.
    pub parent_guid: Option<Guid>,
    /// Has local changes not yet pushed remotely.
    pub dirty: bool,
    /// Never sent remotely; required true for `expunge`.
    pub is_local: bool,
    /// Marked for deletion; hidden from default listings until expunged.
    pub is_deleted: bool,
}

impl Tag {
    /// Creates a new local-only Tag with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name_upper = name.to_uppercase();
        Self {
            local_uid: LocalUid::new(),
            guid: None,
            update_sequence_num: None,
            name,
            name_upper,
            parent_guid: None,
            dirty: true,
            is_local: true,
            is_deleted: false,
        }
    }

    /// Validates field-level invariants. Uniqueness of `name_upper` is
    /// checked against the database, not here.
    pub fn check_parameters(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required_field("name"));
        }
        if self.name.len() > 100 {
            return Err(ValidationError::invalid_field(
                "name",
                "must be 100 characters or fewer",
            ));
        }
        if self.name.contains(',') {
            return Err(ValidationError::invalid_field(
                "name",
                "must not contain a comma",
            ));
        }
        Ok(())
    }
}

/// Fields supplied by a caller creating a new Tag.
#[derive(Clone, Debug, Default)]
pub struct NewTag {
    /// Remote identifier, if already known.
    pub guid: Option<Guid>,
    /// Display name.
    pub name: String,
    /// Guid of the parent tag, if nesting under one.
    pub parent_guid: Option<Guid>,
}

/// Partial update to an existing Tag.
#[derive(Clone, Debug, Default)]
pub struct TagUpdate {
    /// New display name, if renaming.
    pub name: Option<String>,
    /// New parent assignment; `Some(None)` detaches from the parent.
    pub parent_guid: Option<Option<Guid>>,
}
