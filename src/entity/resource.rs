//! The Resource entity: a binary attachment belonging to exactly one Note.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Guid, LocalUid, Timestamp};

/// A data body stored alongside its size and hash, so the hash can be
/// verified without re-hashing the body and recognition data is never
/// conflated with the primary data body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataBody {
    /// Raw bytes.
    pub body: Vec<u8>,
    /// Byte length of `body`.
    pub size: u64,
    /// Content hash (MD5, per the upstream wire format).
    pub hash: Vec<u8>,
}

/// Nested, optional attributes of a Resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    /// Source URL the resource was fetched from.
    pub source_url: Option<String>,
    /// Capture timestamp.
    pub timestamp: Option<Timestamp>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Camera make.
    pub camera_make: Option<String>,
    /// Camera model.
    pub camera_model: Option<String>,
    /// Recognition type hint (e.g. "picture", "handwriting").
    pub recognition_type: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
    /// Whether this resource should be treated as an attachment rather
    /// than inline content.
    pub attachment: Option<bool>,
    /// Application-assigned key/value data.
    pub application_data: HashMap<String, String>,
}

/// A Resource: a binary attachment belonging to exactly one Note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Locally-assigned, stable identifier.
    pub local_uid: LocalUid,
    /// Remote identifier, present once synchronized.
    pub guid: Option<Guid>,
    /// Local uid of the owning Note.
    pub note_local_uid: LocalUid,
    /// Remote guid of the owning Note, if known.
    pub note_guid: Option<Guid>,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Primary data body.
    pub data: DataBody,
    /// MIME type of `data.body`.
    pub mime: String,
    /// Pixel width, for image resources.
    pub width: Option<i16>,
    /// Pixel height, for image resources.
    pub height: Option<i16>,
    /// Recognition (OCR/handwriting) data, kept separate from `data`.
    pub recognition_data: Option<DataBody>,
    /// Position among the note's resources; preserved across reads/writes.
    pub index_in_note: i32,
    /// Nested optional attributes.
    pub attributes: Option<ResourceAttributes>,
}

/// Fields supplied by a caller attaching a new Resource to a Note.
#[derive(Clone, Debug)]
pub struct NewResource {
    /// Remote identifier, if already known.
    pub guid: Option<Guid>,
    /// Local uid of the owning Note.
    pub note_local_uid: LocalUid,
    /// Primary data body.
    pub data: DataBody,
    /// MIME type of `data.body`.
    pub mime: String,
    /// Pixel width, for image resources.
    pub width: Option<i16>,
    /// Pixel height, for image resources.
    pub height: Option<i16>,
    /// Recognition data, if available.
    pub recognition_data: Option<DataBody>,
    /// Position among the note's resources.
    pub index_in_note: i32,
    /// Nested optional attributes.
    pub attributes: Option<ResourceAttributes>,
}
