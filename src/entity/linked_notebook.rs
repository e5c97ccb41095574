//! The LinkedNotebook entity: a reference to a Notebook owned by another
//! account, shared into this one.

use serde::{Deserialize, Serialize};

use crate::types::Guid;

/// A LinkedNotebook: a reference to a Notebook owned by another account.
/// Keyed by `guid` alone — linked notebooks have no local-only lifecycle,
/// since they cannot exist before the remote share is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkedNotebook {
    /// Remote identifier; primary key for this entity family.
    pub guid: Guid,
    /// Server-assigned monotonic update sequence number.
    pub update_sequence_num: Option<i32>,
    /// Display name of the share, as presented by the owning account.
    pub share_name: Option<String>,
    /// Share key used to accept/refresh the link.
    pub share_key: Option<String>,
    /// Shard identifier of the owning account.
    pub shard_id: Option<String>,
    /// URI of the owning account's note store, for sync.
    pub uri: Option<String>,
    /// Note-store URL of the owning account.
    pub note_store_url: Option<String>,
    /// Web API URL prefix of the owning account.
    pub web_api_url_prefix: Option<String>,
    /// Optional named stack this link belongs to, for grouping.
    pub stack: Option<String>,
    /// Business id, for business-shared linked notebooks.
    pub business_id: Option<i64>,
}
