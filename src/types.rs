//! Core type definitions: local identifiers, remote guids, and timestamps.
//!
//! Every persistent entity carries a [`LocalUid`] (always present, assigned
//! on creation) and an optional [`Guid`] (present once the remote service has
//! seen the entity). Equality of entities is always by `LocalUid`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Locally-generated stable identifier for an entity, present from creation.
///
/// Never changes once assigned, and is the equality key for every entity
/// family regardless of whether the entity has been synchronized remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalUid(pub Uuid);

impl LocalUid {
    /// Creates a new `LocalUid` with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) `LocalUid`, used as a sentinel before a
    /// real identifier has been assigned.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a `LocalUid` from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns true if this is the nil sentinel.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for LocalUid {
    /// Returns the nil sentinel. For a freshly assigned identifier use
    /// [`LocalUid::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for LocalUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote-service-assigned identifier, present only after the entity has
/// been synchronized at least once.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid(pub String);

impl Guid {
    /// Wraps a raw guid string.
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    /// Returns the guid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminates which identifier a lookup key refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhichGuid {
    /// Look up by `local_uid`.
    LocalUid,
    /// Look up by remote `guid`.
    RemoteGuid,
}

/// Unix timestamp in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen in
    /// practice), returns a timestamp of 0 rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns big-endian bytes for storage (enables lexicographic ordering
    /// to match numeric ordering in index keys).
    #[inline]
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-chosen identifier echoed back on every response to a request,
/// letting a producer match asynchronous outcomes to their call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Creates a new correlation id.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote-assigned numeric id for a User row (Users are keyed by integer,
/// not by `LocalUid`, per the upstream protocol).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_uid_new_is_unique() {
        assert_ne!(LocalUid::new(), LocalUid::new());
    }

    #[test]
    fn local_uid_nil_is_default() {
        assert_eq!(LocalUid::default(), LocalUid::nil());
        assert!(LocalUid::nil().is_nil());
    }

    #[test]
    fn local_uid_bytes_roundtrip() {
        let id = LocalUid::new();
        let bytes = *id.as_bytes();
        assert_eq!(id, LocalUid::from_bytes(bytes));
    }

    #[test]
    fn timestamp_be_bytes_preserve_order() {
        let t1 = Timestamp::from_millis(100);
        let t2 = Timestamp::from_millis(200);
        assert!(t1.to_be_bytes() < t2.to_be_bytes());
    }

    #[test]
    fn timestamp_now_is_monotonic_enough() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let t2 = Timestamp::now();
        assert!(t1 < t2);
    }

    #[test]
    fn correlation_id_roundtrips_through_display() {
        let id = CorrelationId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
