//! The SharedNotebook entity: one invitation/membership record for a shared
//! Notebook.

use serde::{Deserialize, Serialize};

use crate::types::{Guid, Timestamp};

/// A SharedNotebook: one invitation/membership record for a shared
/// Notebook. Ordering returned to callers is ascending by
/// `index_in_notebook` (invariant 8).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharedNotebook {
    /// Server-assigned share identifier, primary key.
    pub share_id: i64,
    /// Id of the user the notebook is shared with, if known.
    pub user_id: Option<i64>,
    /// Guid of the shared Notebook.
    pub notebook_guid: Guid,
    /// Email address the share was sent to.
    pub email: Option<String>,
    /// Creation time.
    pub creation_timestamp: Option<Timestamp>,
    /// Last-modification time.
    pub modification_timestamp: Option<Timestamp>,
    /// Privilege level granted to the recipient.
    pub privilege: Option<i32>,
    /// Whether the recipient may preview without accepting.
    pub allow_preview: bool,
    /// Whether a reminder notification should be sent to the recipient.
    pub recipient_reminder_notify_email: bool,
    /// Whether in-app reminder notifications are enabled for the recipient.
    pub recipient_reminder_notify_in_app: bool,
    /// Position among the notebook's shares; server-reported ordering.
    pub index_in_notebook: i32,
}
