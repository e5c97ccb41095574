//! Configuration types for the local-storage core.
//!
//! The [`Config`] struct controls:
//! - where per-account databases live on disk,
//! - cache bounds per entity family,
//! - durability mode for writes,
//! - the async worker's channel capacity.
//!
//! # Example
//! ```rust
//! use qnote_storage::{Config, SyncMode};
//!
//! let config = Config {
//!     sync_mode: SyncMode::Normal,
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Storage-core configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use qnote_storage::Config;
///
/// let config = Config {
///     worker_channel_capacity: 256,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory under which one subdirectory per `(username, user_id)`
    /// is created, each holding a single SQL database file.
    pub data_root: PathBuf,

    /// Durability mode for write operations.
    pub sync_mode: SyncMode,

    /// Cache bounds for each entity family. See [`CacheBounds`].
    pub cache_bounds: CacheBounds,

    /// Capacity of the bounded channel between the request façade and the
    /// async worker. Backpressure, not data loss: a full channel blocks the
    /// sender rather than dropping requests.
    pub worker_channel_capacity: usize,

    /// Whether the worker's find/list path consults the cache at all.
    /// Mirrors the upstream `use_cache` toggle; disabling it always
    /// delegates to SQL and clears the cache on the transition.
    pub use_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            sync_mode: SyncMode::Normal,
            cache_bounds: CacheBounds::default(),
            worker_channel_capacity: 64,
            use_cache: true,
        }
    }
}

impl Config {
    /// Creates a new `Config` with default settings rooted at `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by [`crate::StorageCore::open`]. You can also
    /// call this explicitly to check configuration before attempting to
    /// open.
    ///
    /// # Errors
    /// Returns [`ValidationError`] if `worker_channel_capacity` is 0 or any
    /// cache bound is 0.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_channel_capacity == 0 {
            return Err(ValidationError::invalid_field(
                "worker_channel_capacity",
                "must be greater than 0",
            ));
        }
        self.cache_bounds.validate()?;
        Ok(())
    }
}

/// Per-entity-family cache size bounds.
///
/// The upstream checker interface defines bounds only for Notes (100) and
/// Notebooks (20); bounds for Tags and SavedSearches are an implementation
/// decision (see `DESIGN.md`). This crate picks explicit, generous bounds for
/// both rather than leaving them unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBounds {
    /// Maximum cached Notes. Default: 100.
    pub notes: usize,
    /// Maximum cached Notebooks. Default: 20.
    pub notebooks: usize,
    /// Maximum cached Tags. Default: 200.
    pub tags: usize,
    /// Maximum cached SavedSearches. Default: 200.
    pub saved_searches: usize,
    /// Maximum cached LinkedNotebooks. Default: 50.
    pub linked_notebooks: usize,
}

impl Default for CacheBounds {
    fn default() -> Self {
        Self {
            notes: 100,
            notebooks: 20,
            tags: 200,
            saved_searches: 200,
            linked_notebooks: 50,
        }
    }
}

impl CacheBounds {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("cache_bounds.notes", self.notes),
            ("cache_bounds.notebooks", self.notebooks),
            ("cache_bounds.tags", self.tags),
            ("cache_bounds.saved_searches", self.saved_searches),
            ("cache_bounds.linked_notebooks", self.linked_notebooks),
        ] {
            if value == 0 {
                return Err(ValidationError::invalid_field(
                    field,
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

/// Durability mode for write operations, mapped onto SQLite's `synchronous`
/// pragma.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `PRAGMA synchronous = NORMAL`. The default and recommended setting:
    /// safe against application crashes, not against OS-level power loss.
    #[default]
    Normal,

    /// `PRAGMA synchronous = OFF`. Fastest writes; a crash can corrupt the
    /// database. Use only for throwaway/test databases.
    Fast,

    /// `PRAGMA synchronous = FULL`. Syncs on every transaction; safe against
    /// power loss, slowest for high write volumes.
    Paranoid,
}

impl SyncMode {
    /// Returns true if this mode syncs on every write.
    pub fn is_paranoid(&self) -> bool {
        matches!(self, Self::Paranoid)
    }

    /// Returns true if this mode is async (may lose data on crash).
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }

    /// Returns the SQLite pragma value for this mode.
    pub fn pragma_value(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Fast => "OFF",
            Self::Paranoid => "FULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_bounds.notes, 100);
        assert_eq!(config.cache_bounds.notebooks, 20);
    }

    #[test]
    fn zero_channel_capacity_fails_validation() {
        let config = Config {
            worker_channel_capacity: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidField { field, .. } if field == "worker_channel_capacity")
        );
    }

    #[test]
    fn zero_cache_bound_fails_validation() {
        let config = Config {
            cache_bounds: CacheBounds {
                notes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sync_mode_pragma_values() {
        assert_eq!(SyncMode::Normal.pragma_value(), "NORMAL");
        assert_eq!(SyncMode::Fast.pragma_value(), "OFF");
        assert_eq!(SyncMode::Paranoid.pragma_value(), "FULL");
        assert!(SyncMode::Fast.is_fast());
        assert!(SyncMode::Paranoid.is_paranoid());
    }

    #[test]
    fn new_sets_data_root() {
        let config = Config::new("/tmp/accounts");
        assert_eq!(config.data_root, PathBuf::from("/tmp/accounts"));
    }
}
