//! The Note entity: the core content-bearing record, belonging to exactly
//! one Notebook and tagged by zero or more Tags.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Guid, LocalUid, Timestamp};

/// Nested, optional attributes of a Note. Every leaf is represented
/// distinctly as present/absent — "absent" is never collapsed with a
/// default-constructed value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteAttributes {
    /// Date the subject matter of the note occurred, if known.
    pub subject_date: Option<Timestamp>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Free-text author.
    pub author: Option<String>,
    /// Free-text source (e.g. "web.clip", "mobile.android").
    pub source: Option<String>,
    /// Source URL the content was clipped from.
    pub source_url: Option<String>,
    /// Application-assigned source identifier.
    pub source_application: Option<String>,
    /// Reminder due time, if a reminder is set.
    pub reminder_time: Option<Timestamp>,
    /// Reminder fired-at time, if the reminder already fired.
    pub reminder_done_time: Option<Timestamp>,
    /// Reminder original (un-snoozed) due time.
    pub reminder_order: Option<i64>,
    /// Free-text place name associated with the note.
    pub place_name: Option<String>,
    /// MIME-ish content classification hint.
    pub content_class: Option<String>,
    /// Id of the user who last edited the note, for shared notebooks.
    pub last_editor_id: Option<i64>,
    /// Keys the application has set on this note, without their values —
    /// kept as a set distinct from `application_data_full_map` per the
    /// upstream's keys-only-set ∪ full-map representation.
    pub application_data_keys_only: HashSet<String>,
    /// Full application-data key/value map.
    pub application_data_full_map: HashMap<String, String>,
    /// Content classification labels (e.g. spam/ham classifier output).
    pub classifications: HashMap<String, String>,
}

/// A Note: the core content-bearing record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Locally-assigned, stable identifier.
    pub local_uid: LocalUid,
    /// Remote identifier, present once synchronized.
    pub guid: Option<Guid>,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Local uid of the owning Notebook.
    pub notebook_local_uid: LocalUid,
    /// Remote guid of the owning Notebook, if known.
    pub notebook_guid: Option<Guid>,
    /// Title.
    pub title: String,
    /// ENML content body. Treated as an opaque string by the core.
    pub content: String,
    /// Creation time.
    pub creation_timestamp: Option<Timestamp>,
    /// Last-modification time.
    pub modification_timestamp: Option<Timestamp>,
    /// Present once the note has been (soft-)deleted.
    pub deletion_timestamp: Option<Timestamp>,
    /// Whether the note should be shown to the user (false while e.g. being
    /// edited as a conflict copy).
    pub is_active: bool,
    /// Opaque thumbnail blob, if generated.
    pub thumbnail: Option<Vec<u8>>,
    /// Guids of tags applied to this note, in `index_in_note` order.
    pub tag_guids: Vec<Guid>,
    /// Nested optional attributes.
    pub attributes: Option<NoteAttributes>,
    /// User-flagged for quick access.
    pub favorited: bool,
    /// Has local changes not yet pushed remotely.
    pub dirty: bool,
    /// Never sent remotely; required true for `expunge`.
    pub is_local: bool,
}

impl Note {
    /// Validates field-level invariants before `add`/`update` persist the
    /// note. Notebook-restriction checks happen in the storage engine,
    /// which has access to the target notebook's restriction matrix.
    pub fn check_parameters(&self) -> Result<(), ValidationError> {
        if self.title.len() > 255 {
            return Err(ValidationError::invalid_field(
                "title",
                "must be 255 characters or fewer",
            ));
        }
        const MAX_CONTENT_BYTES: usize = 5 * 1024 * 1024;
        if self.content.len() > MAX_CONTENT_BYTES {
            return Err(ValidationError::content_too_large(
                self.content.len(),
                MAX_CONTENT_BYTES,
            ));
        }
        const MAX_TAGS: usize = 100;
        if self.tag_guids.len() > MAX_TAGS {
            return Err(ValidationError::too_many_items(
                "tag_guids",
                self.tag_guids.len(),
                MAX_TAGS,
            ));
        }
        Ok(())
    }
}

/// Fields supplied by a caller creating a new Note.
#[derive(Clone, Debug, Default)]
pub struct NewNote {
    /// Remote identifier, if already known.
    pub guid: Option<Guid>,
    /// Local uid of the target Notebook.
    pub notebook_local_uid: LocalUid,
    /// Title.
    pub title: String,
    /// ENML content body.
    pub content: String,
    /// Tag guids to apply, in order.
    pub tag_guids: Vec<Guid>,
    /// Nested optional attributes.
    pub attributes: Option<NoteAttributes>,
}

/// Partial update to an existing Note.
#[derive(Clone, Debug, Default)]
pub struct NoteUpdate {
    /// New title, if changing.
    pub title: Option<String>,
    /// New content body, if changing.
    pub content: Option<String>,
    /// New notebook assignment (move), if changing.
    pub notebook_local_uid: Option<LocalUid>,
    /// New full tag list, if changing; replaces the join-table rows
    /// wholesale, preserving the caller's ordering as `index_in_note`.
    pub tag_guids: Option<Vec<Guid>>,
    /// New attributes, if changing; `Some(None)` clears them.
    pub attributes: Option<Option<NoteAttributes>>,
    /// New favorited flag.
    pub favorited: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        Note {
            local_uid: LocalUid::new(),
            guid: None,
            update_sequence_num: None,
            notebook_local_uid: LocalUid::new(),
            notebook_guid: None,
            title: "Hello".into(),
            content: "<en-note>hi</en-note>".into(),
            creation_timestamp: Some(Timestamp::now()),
            modification_timestamp: Some(Timestamp::now()),
            deletion_timestamp: None,
            is_active: true,
            thumbnail: None,
            tag_guids: vec![],
            attributes: None,
            favorited: false,
            dirty: true,
            is_local: true,
        }
    }

    #[test]
    fn valid_note_passes_check() {
        assert!(sample_note().check_parameters().is_ok());
    }

    #[test]
    fn oversized_title_fails_check() {
        let mut note = sample_note();
        note.title = "x".repeat(256);
        assert!(note.check_parameters().is_err());
    }
}
