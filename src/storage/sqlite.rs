//! SQLite-backed implementation of [`StorageEngine`].
//!
//! Owns one [`rusqlite::Connection`] tied to a filesystem path derived from
//! `(username, user_id)`, per §4.1. The connection is wrapped in a `Mutex`
//! solely to satisfy `Send + Sync` — in practice only the async worker's
//! single thread ever calls in, so the mutex is never contended.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::entity::{
    LinkedNotebook, NewNote, NewNotebook, NewResource, NewSavedSearch, NewTag, Note, NoteUpdate,
    Notebook, NotebookBusiness, NotebookPublishing, NotebookRestrictions, NotebookUpdate,
    Resource, ResourceAttributes, NoteAttributes, SavedSearch, SavedSearchUpdate,
    SearchQueryFormat, SharedNotebook, Tag, TagUpdate, User, DataBody,
};
use crate::error::{DbError, NotFoundError, Result, StorageCoreError};
use crate::search::{ListFilter, SortDirection, SortOrder};
use crate::types::{Guid, LocalUid, Timestamp, WhichGuid};

use super::schema::{DatabaseMetadata, CREATE_SCHEMA_SQL, DATABASE_FILE_NAME, SCHEMA_VERSION};
use super::transaction::{Transaction, TransactionMode};
use super::StorageEngine;

/// SQLite-backed [`StorageEngine`] implementation.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    path: PathBuf,
    metadata: DatabaseMetadata,
}

impl SqliteStorage {
    /// Opens (creating if missing) the per-account database at
    /// `data_root/<username>-<user_id>/storage.sqlite`.
    #[tracing::instrument(skip(config))]
    pub fn open(
        username: &str,
        user_id: i64,
        config: &Config,
        start_from_scratch: bool,
    ) -> Result<Self> {
        let account_dir = config.data_root.join(format!("{username}-{user_id}"));
        fs::create_dir_all(&account_dir)
            .map_err(|e| DbError::open(account_dir.clone(), e.to_string()))?;
        let path = account_dir.join(DATABASE_FILE_NAME);

        if start_from_scratch && path.exists() {
            fs::remove_file(&path).map_err(|e| DbError::open(path.clone(), e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(|e| DbError::open(path.clone(), e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DbError::sql("PRAGMA foreign_keys = ON", e.to_string()))?;
        conn.pragma_update(None, "synchronous", config.sync_mode.pragma_value())
            .map_err(|e| DbError::sql("PRAGMA synchronous", e.to_string()))?;

        let found_version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| DbError::sql("PRAGMA user_version", e.to_string()))? as u32;

        if found_version > SCHEMA_VERSION {
            return Err(DbError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: found_version,
            }
            .into());
        }

        conn.execute_batch(CREATE_SCHEMA_SQL)
            .map_err(|e| DbError::sql("CREATE_SCHEMA_SQL", e.to_string()))?;

        if found_version == 0 {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION as i64)
                .map_err(|e| DbError::sql("PRAGMA user_version", e.to_string()))?;
        }

        tracing::info!(path = %path.display(), schema_version = SCHEMA_VERSION, "opened storage engine");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            metadata: DatabaseMetadata {
                schema_version: SCHEMA_VERSION.max(found_version),
                opened_at: Timestamp::now(),
            },
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("storage connection mutex poisoned")
    }
}

// ---------------------------------------------------------------------------
// Small conversions shared across entity families
// ---------------------------------------------------------------------------

fn opt_guid(s: Option<String>) -> Option<Guid> {
    s.map(Guid)
}

fn opt_ts(v: Option<i64>) -> Option<Timestamp> {
    v.map(Timestamp)
}

fn json_string_set(set: &HashSet<String>) -> String {
    serde_json::to_string(set).unwrap_or_default()
}

fn json_string_map(map: &HashMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_default()
}

fn parse_string_set(s: Option<String>) -> HashSet<String> {
    s.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

fn parse_string_map(s: Option<String>) -> HashMap<String, String> {
    s.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// Loads the restriction row for a Notebook, defaulting to "everything
/// allowed" if the Notebook has no restriction row at all.
fn load_notebook_restrictions(conn: &Connection, local_uid_key: &str) -> rusqlite::Result<NotebookRestrictions> {
    conn.query_row(
        "SELECT no_read_notes, no_create_notes, no_update_notes, no_expunge_notes, \
         no_share_notes, no_rename_notebook, no_update_notebook, no_expunge_notebook, \
         no_create_tags, no_update_tags, no_expunge_tags, no_set_default_notebook, \
         no_publish_to_public, no_send_to_business \
         FROM notebook_restrictions WHERE notebook_local_uid = ?1",
        params![local_uid_key],
        |r| {
            Ok(NotebookRestrictions {
                no_read_notes: r.get(0)?,
                no_create_notes: r.get(1)?,
                no_update_notes: r.get(2)?,
                no_expunge_notes: r.get(3)?,
                no_share_notes: r.get(4)?,
                no_rename_notebook: r.get(5)?,
                no_update_notebook: r.get(6)?,
                no_expunge_notebook: r.get(7)?,
                no_create_tags: r.get(8)?,
                no_update_tags: r.get(9)?,
                no_expunge_tags: r.get(10)?,
                no_set_default_notebook: r.get(11)?,
                no_publish_to_public: r.get(12)?,
                no_send_to_business: r.get(13)?,
            })
        },
    )
    .optional()
    .map(|r| r.unwrap_or_default())
}

fn row_to_notebook(conn: &Connection, row: &rusqlite::Row) -> rusqlite::Result<Notebook> {
    let local_uid: String = row.get("local_uid")?;
    let local_uid = LocalUid(local_uid.parse().unwrap_or_default());

    let restrictions = load_notebook_restrictions(conn, &local_uid.to_string())?;

    let publishing = conn
        .query_row(
            "SELECT uri, order_num, ascending, public_description FROM notebook_publishing \
             WHERE notebook_local_uid = ?1",
            params![local_uid.to_string()],
            |r| {
                Ok(NotebookPublishing {
                    uri: r.get(0)?,
                    order: r.get(1)?,
                    ascending: r.get(2)?,
                    public_description: r.get(3)?,
                })
            },
        )
        .optional()?;

    let business = conn
        .query_row(
            "SELECT notebook_description, required_privilege FROM notebook_business \
             WHERE notebook_local_uid = ?1",
            params![local_uid.to_string()],
            |r| {
                Ok(NotebookBusiness {
                    notebook_description: r.get(0)?,
                    required_privilege: r.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(Notebook {
        local_uid,
        guid: opt_guid(row.get("guid")?),
        update_sequence_num: row.get("update_sequence_num")?,
        name: row.get("name")?,
        creation_timestamp: opt_ts(row.get("creation_timestamp")?),
        modification_timestamp: opt_ts(row.get("modification_timestamp")?),
        is_default: row.get("is_default")?,
        is_last_used: row.get("is_last_used")?,
        stack: row.get("stack")?,
        publishing,
        business,
        contact_user_id: row.get("contact_user_id")?,
        restrictions,
        dirty: row.get("dirty")?,
        is_local: row.get("is_local")?,
    })
}

impl StorageEngine for SqliteStorage {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn close(self: Box<Self>) -> Result<()> {
        tracing::info!(path = %self.path.display(), "closing storage engine");
        Ok(())
    }

    // ---- Notebook -----------------------------------------------------

    fn count_notebooks(&self) -> Result<u64> {
        let conn = self.conn();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM notebooks", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    #[tracing::instrument(skip(self, new))]
    fn add_notebook(&self, new: NewNotebook) -> Result<Notebook> {
        let conn = self.conn();
        let local_uid = LocalUid::new();
        let name_upper = new.name.to_uppercase();

        let exists: Option<String> = conn
            .query_row(
                "SELECT local_uid FROM notebooks WHERE name_upper = ?1",
                params![name_upper],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StorageCoreError::conflict(format!(
                "a notebook named '{}' already exists",
                new.name
            )));
        }

        let txn = Transaction::begin(&conn, TransactionMode::Immediate)?;
        let now = Timestamp::now().as_millis();

        if new.is_default {
            conn.execute("UPDATE notebooks SET is_default = 0", [])?;
        }

        conn.execute(
            "INSERT INTO notebooks (local_uid, guid, name, name_upper, creation_timestamp, \
             modification_timestamp, is_default, stack, dirty, is_local) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7, 1, 1)",
            params![
                local_uid.to_string(),
                new.guid.as_ref().map(Guid::as_str),
                new.name,
                name_upper,
                now,
                new.is_default,
                new.stack,
            ],
        )?;
        conn.execute(
            "INSERT INTO notebook_restrictions (notebook_local_uid, no_read_notes, \
             no_create_notes, no_update_notes, no_expunge_notes, no_share_notes, \
             no_rename_notebook, no_update_notebook, no_expunge_notebook, no_create_tags, \
             no_update_tags, no_expunge_tags, no_set_default_notebook, no_publish_to_public, \
             no_send_to_business) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, \
             ?13, ?14, ?15)",
            params![
                local_uid.to_string(),
                new.restrictions.no_read_notes,
                new.restrictions.no_create_notes,
                new.restrictions.no_update_notes,
                new.restrictions.no_expunge_notes,
                new.restrictions.no_share_notes,
                new.restrictions.no_rename_notebook,
                new.restrictions.no_update_notebook,
                new.restrictions.no_expunge_notebook,
                new.restrictions.no_create_tags,
                new.restrictions.no_update_tags,
                new.restrictions.no_expunge_tags,
                new.restrictions.no_set_default_notebook,
                new.restrictions.no_publish_to_public,
                new.restrictions.no_send_to_business,
            ],
        )?;
        txn.commit()?;
        drop(conn);

        self.find_notebook(&local_uid.to_string(), WhichGuid::LocalUid)
    }

    #[tracing::instrument(skip(self, update))]
    fn update_notebook(&self, local_uid: LocalUid, update: NotebookUpdate) -> Result<Notebook> {
        let conn = self.conn();
        let key = local_uid.to_string();
        let existing_name: String = conn
            .query_row(
                "SELECT name FROM notebooks WHERE local_uid = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::notebook(&key))?;

        let restrictions = load_notebook_restrictions(&conn, &key)?;
        if restrictions.no_update_notebook {
            return Err(StorageCoreError::restriction(
                "notebook forbids being updated",
            ));
        }
        if update.name.is_some() && restrictions.no_rename_notebook {
            return Err(StorageCoreError::restriction(
                "notebook forbids being renamed",
            ));
        }

        let txn = Transaction::begin(&conn, TransactionMode::Immediate)?;
        if let Some(ref name) = update.name {
            let name_upper = name.to_uppercase();
            if name_upper != existing_name.to_uppercase() {
                let dup: Option<String> = conn
                    .query_row(
                        "SELECT local_uid FROM notebooks WHERE name_upper = ?1 AND local_uid != ?2",
                        params![name_upper, key],
                        |r| r.get(0),
                    )
                    .optional()?;
                if dup.is_some() {
                    return Err(StorageCoreError::conflict(format!(
                        "a notebook named '{name}' already exists"
                    )));
                }
            }
            conn.execute(
                "UPDATE notebooks SET name = ?1, name_upper = ?2 WHERE local_uid = ?3",
                params![name, name_upper, key],
            )?;
        }
        if let Some(is_default) = update.is_default {
            if is_default {
                conn.execute("UPDATE notebooks SET is_default = 0", [])?;
            }
            conn.execute(
                "UPDATE notebooks SET is_default = ?1 WHERE local_uid = ?2",
                params![is_default, key],
            )?;
        }
        if let Some(is_last_used) = update.is_last_used {
            if is_last_used {
                conn.execute("UPDATE notebooks SET is_last_used = 0", [])?;
            }
            conn.execute(
                "UPDATE notebooks SET is_last_used = ?1 WHERE local_uid = ?2",
                params![is_last_used, key],
            )?;
        }
        if let Some(stack) = update.stack {
            conn.execute(
                "UPDATE notebooks SET stack = ?1 WHERE local_uid = ?2",
                params![stack, key],
            )?;
        }
        if let Some(r) = update.restrictions {
            conn.execute(
                "INSERT OR REPLACE INTO notebook_restrictions (notebook_local_uid, \
                 no_read_notes, no_create_notes, no_update_notes, no_expunge_notes, \
                 no_share_notes, no_rename_notebook, no_update_notebook, no_expunge_notebook, \
                 no_create_tags, no_update_tags, no_expunge_tags, no_set_default_notebook, \
                 no_publish_to_public, no_send_to_business) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, \
                 ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    key,
                    r.no_read_notes,
                    r.no_create_notes,
                    r.no_update_notes,
                    r.no_expunge_notes,
                    r.no_share_notes,
                    r.no_rename_notebook,
                    r.no_update_notebook,
                    r.no_expunge_notebook,
                    r.no_create_tags,
                    r.no_update_tags,
                    r.no_expunge_tags,
                    r.no_set_default_notebook,
                    r.no_publish_to_public,
                    r.no_send_to_business,
                ],
            )?;
        }
        conn.execute(
            "UPDATE notebooks SET modification_timestamp = ?1, dirty = 1 WHERE local_uid = ?2",
            params![Timestamp::now().as_millis(), key],
        )?;
        txn.commit()?;
        drop(conn);

        self.find_notebook(&key, WhichGuid::LocalUid)
    }

    fn find_notebook(&self, key: &str, which: WhichGuid) -> Result<Notebook> {
        let conn = self.conn();
        let sql = match which {
            WhichGuid::LocalUid => "SELECT * FROM notebooks WHERE local_uid = ?1",
            WhichGuid::RemoteGuid => "SELECT * FROM notebooks WHERE guid = ?1",
        };
        conn.query_row(sql, params![key], |row| row_to_notebook(&conn, row))
            .optional()?
            .ok_or_else(|| NotFoundError::notebook(key).into())
    }

    fn list_notebooks(
        &self,
        _filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Notebook>> {
        let conn = self.conn();
        let order_col = match order {
            SortOrder::Title => "name_upper",
            SortOrder::CreatedAt => "creation_timestamp",
            SortOrder::UpdatedAt => "modification_timestamp",
            SortOrder::Natural => "rowid",
        };
        let dir = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let sql = format!(
            "SELECT * FROM notebooks ORDER BY {order_col} {dir} LIMIT ?1 OFFSET ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let limit = limit.unwrap_or(u32::MAX) as i64;
        let rows = stmt.query_map(params![limit, offset], |row| row_to_notebook(&conn, row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn delete_notebook(&self, local_uid: LocalUid) -> Result<()> {
        // Notebooks have no remote-deletion privilege for third-party apps;
        // only expunge (for local notebooks) removes the row.
        if self.find_notebook(&local_uid.to_string(), WhichGuid::LocalUid)?.is_local {
            self.expunge_notebook(local_uid)
        } else {
            Ok(())
        }
    }

    fn expunge_notebook(&self, local_uid: LocalUid) -> Result<()> {
        let conn = self.conn();
        let key = local_uid.to_string();
        let is_local: bool = conn
            .query_row(
                "SELECT is_local FROM notebooks WHERE local_uid = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::notebook(&key))?;
        if !is_local {
            return Err(StorageCoreError::expunge_policy(
                "cannot expunge a non-local notebook",
            ));
        }
        conn.execute("DELETE FROM notebooks WHERE local_uid = ?1", params![key])?;
        Ok(())
    }

    fn find_default_notebook(&self) -> Result<Option<Notebook>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM notebooks WHERE is_default = 1",
            [],
            |row| row_to_notebook(&conn, row),
        )
        .optional()
        .map_err(Into::into)
    }

    fn find_last_used_notebook(&self) -> Result<Option<Notebook>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM notebooks WHERE is_last_used = 1",
            [],
            |row| row_to_notebook(&conn, row),
        )
        .optional()
        .map_err(Into::into)
    }

    // ---- SharedNotebook -------------------------------------------------

    fn list_shared_notebooks_for_notebook(
        &self,
        notebook_guid: &Guid,
    ) -> Result<Vec<SharedNotebook>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT share_id, user_id, notebook_guid, email, creation_timestamp, \
             modification_timestamp, privilege, allow_preview, \
             recipient_reminder_notify_email, recipient_reminder_notify_in_app, \
             index_in_notebook FROM shared_notebooks WHERE notebook_guid = ?1 \
             ORDER BY index_in_notebook ASC",
        )?;
        let rows = stmt.query_map(params![notebook_guid.as_str()], |r| {
            Ok(SharedNotebook {
                share_id: r.get(0)?,
                user_id: r.get(1)?,
                notebook_guid: Guid(r.get(2)?),
                email: r.get(3)?,
                creation_timestamp: opt_ts(r.get(4)?),
                modification_timestamp: opt_ts(r.get(5)?),
                privilege: r.get(6)?,
                allow_preview: r.get(7)?,
                recipient_reminder_notify_email: r.get(8)?,
                recipient_reminder_notify_in_app: r.get(9)?,
                index_in_notebook: r.get(10)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    // ---- LinkedNotebook -------------------------------------------------

    fn add_linked_notebook(&self, linked: LinkedNotebook) -> Result<LinkedNotebook> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO linked_notebooks (guid, update_sequence_num, share_name, \
             share_key, shard_id, uri, note_store_url, web_api_url_prefix, stack, business_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                linked.guid.as_str(),
                linked.update_sequence_num,
                linked.share_name,
                linked.share_key,
                linked.shard_id,
                linked.uri,
                linked.note_store_url,
                linked.web_api_url_prefix,
                linked.stack,
                linked.business_id,
            ],
        )?;
        Ok(linked)
    }

    fn find_linked_notebook(&self, guid: &Guid) -> Result<LinkedNotebook> {
        let conn = self.conn();
        conn.query_row(
            "SELECT guid, update_sequence_num, share_name, share_key, shard_id, uri, \
             note_store_url, web_api_url_prefix, stack, business_id FROM linked_notebooks \
             WHERE guid = ?1",
            params![guid.as_str()],
            |r| {
                Ok(LinkedNotebook {
                    guid: Guid(r.get(0)?),
                    update_sequence_num: r.get(1)?,
                    share_name: r.get(2)?,
                    share_key: r.get(3)?,
                    shard_id: r.get(4)?,
                    uri: r.get(5)?,
                    note_store_url: r.get(6)?,
                    web_api_url_prefix: r.get(7)?,
                    stack: r.get(8)?,
                    business_id: r.get(9)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| NotFoundError::linked_notebook(guid.as_str()).into())
    }

    fn list_linked_notebooks(&self) -> Result<Vec<LinkedNotebook>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT guid, update_sequence_num, share_name, share_key, shard_id, uri, \
             note_store_url, web_api_url_prefix, stack, business_id FROM linked_notebooks",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(LinkedNotebook {
                guid: Guid(r.get(0)?),
                update_sequence_num: r.get(1)?,
                share_name: r.get(2)?,
                share_key: r.get(3)?,
                shard_id: r.get(4)?,
                uri: r.get(5)?,
                note_store_url: r.get(6)?,
                web_api_url_prefix: r.get(7)?,
                stack: r.get(8)?,
                business_id: r.get(9)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn expunge_linked_notebook(&self, guid: &Guid) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM linked_notebooks WHERE guid = ?1",
            params![guid.as_str()],
        )?;
        Ok(())
    }

    // ---- Note -----------------------------------------------------------

    fn count_notes(&self, filter: &ListFilter) -> Result<u64> {
        let conn = self.conn();
        let n: i64 = match (&filter.notebook_local_uid, &filter.tag_guid) {
            (Some(nb), _) => conn.query_row(
                "SELECT COUNT(*) FROM notes WHERE deletion_timestamp IS NULL \
                 AND notebook_local_uid = ?1",
                params![nb.to_string()],
                |r| r.get(0),
            )?,
            (None, Some(tag)) => conn.query_row(
                "SELECT COUNT(*) FROM notes n JOIN note_tags nt ON nt.note_local_uid = n.local_uid \
                 JOIN tags t ON t.local_uid = nt.tag_local_uid \
                 WHERE n.deletion_timestamp IS NULL AND t.guid = ?1",
                params![tag.as_str()],
                |r| r.get(0),
            )?,
            (None, None) => conn.query_row(
                "SELECT COUNT(*) FROM notes WHERE deletion_timestamp IS NULL",
                [],
                |r| r.get(0),
            )?,
        };
        Ok(n as u64)
    }

    #[tracing::instrument(skip(self, new))]
    fn add_note(&self, new: NewNote) -> Result<Note> {
        let notebook = self.find_notebook(&new.notebook_local_uid.to_string(), WhichGuid::LocalUid)?;
        if notebook.restrictions.no_create_notes {
            return Err(StorageCoreError::restriction(
                "notebook forbids creating new notes",
            ));
        }
        let conn = self.conn();
        if let Some(guid) = &new.guid {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT local_uid FROM notes WHERE guid = ?1",
                    params![guid.as_str()],
                    |r| r.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StorageCoreError::conflict(format!(
                    "a note with guid '{}' already exists",
                    guid.as_str()
                )));
            }
        }

        let local_uid = LocalUid::new();
        let now = Timestamp::now().as_millis();
        let txn = Transaction::begin(&conn, TransactionMode::Immediate)?;

        conn.execute(
            "INSERT INTO notes (local_uid, guid, notebook_local_uid, notebook_guid, title, \
             content, creation_timestamp, modification_timestamp, is_active, dirty, is_local) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 1, 1, 1)",
            params![
                local_uid.to_string(),
                new.guid.as_ref().map(Guid::as_str),
                new.notebook_local_uid.to_string(),
                notebook.guid.as_ref().map(Guid::as_str),
                new.title,
                new.content,
                now,
            ],
        )?;

        write_note_tags(&conn, local_uid, &new.tag_guids)?;
        if let Some(attrs) = &new.attributes {
            write_note_attributes(&conn, local_uid, attrs)?;
        }

        txn.commit()?;
        drop(conn);
        self.find_note(&local_uid.to_string(), WhichGuid::LocalUid)
    }

    #[tracing::instrument(skip(self, update))]
    fn update_note(&self, local_uid: LocalUid, update: NoteUpdate) -> Result<Note> {
        let key = local_uid.to_string();
        let notebook_local_uid: String = {
            let conn = self.conn();
            conn.query_row(
                "SELECT notebook_local_uid FROM notes WHERE local_uid = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::note(&key))?
        };

        let target_notebook_uid = update
            .notebook_local_uid
            .unwrap_or_else(|| LocalUid(notebook_local_uid.parse().unwrap_or_default()));
        let notebook = self.find_notebook(&target_notebook_uid.to_string(), WhichGuid::LocalUid)?;
        if notebook.restrictions.no_update_notes {
            return Err(StorageCoreError::restriction(
                "notebook forbids updating notes",
            ));
        }

        let conn = self.conn();
        let txn = Transaction::begin(&conn, TransactionMode::Immediate)?;

        if let Some(title) = &update.title {
            conn.execute(
                "UPDATE notes SET title = ?1 WHERE local_uid = ?2",
                params![title, key],
            )?;
        }
        if let Some(content) = &update.content {
            conn.execute(
                "UPDATE notes SET content = ?1 WHERE local_uid = ?2",
                params![content, key],
            )?;
        }
        if let Some(nb) = update.notebook_local_uid {
            conn.execute(
                "UPDATE notes SET notebook_local_uid = ?1, notebook_guid = ?2 WHERE local_uid = ?3",
                params![nb.to_string(), notebook.guid.as_ref().map(Guid::as_str), key],
            )?;
        }
        if let Some(tags) = &update.tag_guids {
            conn.execute(
                "DELETE FROM note_tags WHERE note_local_uid = ?1",
                params![key],
            )?;
            write_note_tags(&conn, local_uid, tags)?;
        }
        if let Some(attrs) = update.attributes {
            conn.execute(
                "DELETE FROM note_attributes WHERE note_local_uid = ?1",
                params![key],
            )?;
            if let Some(attrs) = attrs {
                write_note_attributes(&conn, local_uid, &attrs)?;
            }
        }
        if let Some(favorited) = update.favorited {
            conn.execute(
                "UPDATE notes SET favorited = ?1 WHERE local_uid = ?2",
                params![favorited, key],
            )?;
        }
        conn.execute(
            "UPDATE notes SET modification_timestamp = ?1, dirty = 1 WHERE local_uid = ?2",
            params![Timestamp::now().as_millis(), key],
        )?;

        txn.commit()?;
        drop(conn);
        self.find_note(&key, WhichGuid::LocalUid)
    }

    fn find_note(&self, key: &str, which: WhichGuid) -> Result<Note> {
        let conn = self.conn();
        let sql = match which {
            WhichGuid::LocalUid => "SELECT * FROM notes WHERE local_uid = ?1",
            WhichGuid::RemoteGuid => "SELECT * FROM notes WHERE guid = ?1",
        };
        let mut note = conn
            .query_row(sql, params![key], |row| row_to_note(row))
            .optional()?
            .ok_or_else(|| NotFoundError::note(key))?;

        let note_key = note.local_uid.to_string();

        let mut stmt = conn.prepare(
            "SELECT t.guid FROM note_tags nt JOIN tags t ON t.local_uid = nt.tag_local_uid \
             WHERE nt.note_local_uid = ?1 ORDER BY nt.index_in_note ASC",
        )?;
        note.tag_guids = stmt
            .query_map(params![note_key], |r| r.get::<_, Option<String>>(0))?
            .filter_map(|r| r.ok().flatten())
            .map(Guid)
            .collect();

        note.attributes = conn
            .query_row(
                "SELECT subject_date, latitude, longitude, altitude, author, source, \
                 source_url, source_application, reminder_time, reminder_done_time, \
                 reminder_order, place_name, content_class, last_editor_id, \
                 application_data_keys_only, application_data_full_map, classifications \
                 FROM note_attributes WHERE note_local_uid = ?1",
                params![note_key],
                |r| {
                    Ok(NoteAttributes {
                        subject_date: opt_ts(r.get(0)?),
                        latitude: r.get(1)?,
                        longitude: r.get(2)?,
                        altitude: r.get(3)?,
                        author: r.get(4)?,
                        source: r.get(5)?,
                        source_url: r.get(6)?,
                        source_application: r.get(7)?,
                        reminder_time: opt_ts(r.get(8)?),
                        reminder_done_time: opt_ts(r.get(9)?),
                        reminder_order: r.get(10)?,
                        place_name: r.get(11)?,
                        content_class: r.get(12)?,
                        last_editor_id: r.get(13)?,
                        application_data_keys_only: parse_string_set(r.get(14)?),
                        application_data_full_map: parse_string_map(r.get(15)?),
                        classifications: parse_string_map(r.get(16)?),
                    })
                },
            )
            .optional()?;

        Ok(note)
    }

    fn list_notes(
        &self,
        filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Note>> {
        let conn = self.conn();
        let order_col = match order {
            SortOrder::Title => "title",
            SortOrder::CreatedAt => "creation_timestamp",
            SortOrder::UpdatedAt | SortOrder::Natural => "modification_timestamp",
        };
        let dir = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let limit = limit.unwrap_or(u32::MAX) as i64;

        let local_uids: Vec<String> = if let Some(nb) = &filter.notebook_local_uid {
            let mut stmt = conn.prepare(&format!(
                "SELECT local_uid FROM notes WHERE deletion_timestamp IS NULL \
                 AND notebook_local_uid = ?1 ORDER BY {order_col} {dir} LIMIT ?2 OFFSET ?3"
            ))?;
            stmt.query_map(params![nb.to_string(), limit, offset], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else if let Some(tag) = &filter.tag_guid {
            let mut stmt = conn.prepare(&format!(
                "SELECT n.local_uid FROM notes n JOIN note_tags nt ON nt.note_local_uid = n.local_uid \
                 JOIN tags t ON t.local_uid = nt.tag_local_uid \
                 WHERE n.deletion_timestamp IS NULL AND t.guid = ?1 \
                 ORDER BY n.{order_col} {dir} LIMIT ?2 OFFSET ?3"
            ))?;
            stmt.query_map(params![tag.as_str(), limit, offset], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT local_uid FROM notes WHERE deletion_timestamp IS NULL \
                 ORDER BY {order_col} {dir} LIMIT ?1 OFFSET ?2"
            ))?;
            stmt.query_map(params![limit, offset], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        drop(conn);
        local_uids
            .into_iter()
            .map(|uid| self.find_note(&uid, WhichGuid::LocalUid))
            .collect()
    }

    fn delete_note(&self, local_uid: LocalUid) -> Result<()> {
        let key = local_uid.to_string();
        let is_local = {
            let conn = self.conn();
            conn.query_row(
                "SELECT is_local FROM notes WHERE local_uid = ?1",
                params![key],
                |r| r.get::<_, bool>(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::note(&key))?
        };
        if is_local {
            self.expunge_note(local_uid)
        } else {
            let conn = self.conn();
            conn.execute(
                "UPDATE notes SET deletion_timestamp = ?1, dirty = 1 WHERE local_uid = ?2",
                params![Timestamp::now().as_millis(), key],
            )?;
            Ok(())
        }
    }

    fn expunge_note(&self, local_uid: LocalUid) -> Result<()> {
        let conn = self.conn();
        let key = local_uid.to_string();
        let is_local: bool = conn
            .query_row(
                "SELECT is_local FROM notes WHERE local_uid = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::note(&key))?;
        if !is_local {
            return Err(StorageCoreError::expunge_policy(
                "cannot expunge a non-local note",
            ));
        }
        conn.execute("DELETE FROM notes WHERE local_uid = ?1", params![key])?;
        Ok(())
    }

    // ---- Tag --------------------------------------------------------------

    fn count_tags(&self) -> Result<u64> {
        let conn = self.conn();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tags WHERE is_deleted = 0",
            [],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    fn add_tag(&self, new: NewTag) -> Result<Tag> {
        let conn = self.conn();
        let name_upper = new.name.to_uppercase();
        let dup: Option<String> = conn
            .query_row(
                "SELECT local_uid FROM tags WHERE name_upper = ?1",
                params![name_upper],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(StorageCoreError::conflict(format!(
                "a tag named '{}' already exists",
                new.name
            )));
        }
        if let Some(guid) = &new.guid {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT local_uid FROM tags WHERE guid = ?1",
                    params![guid.as_str()],
                    |r| r.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StorageCoreError::conflict(format!(
                    "a tag with guid '{}' already exists",
                    guid.as_str()
                )));
            }
        }
        let local_uid = LocalUid::new();
        conn.execute(
            "INSERT INTO tags (local_uid, guid, name, name_upper, parent_guid, dirty, is_local) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, 1)",
            params![
                local_uid.to_string(),
                new.guid.as_ref().map(Guid::as_str),
                new.name,
                name_upper,
                new.parent_guid.as_ref().map(Guid::as_str),
            ],
        )?;
        drop(conn);
        self.find_tag(&local_uid.to_string(), WhichGuid::LocalUid)
    }

    fn update_tag(&self, local_uid: LocalUid, update: TagUpdate) -> Result<Tag> {
        let conn = self.conn();
        let key = local_uid.to_string();
        if let Some(name) = &update.name {
            let name_upper = name.to_uppercase();
            let dup: Option<String> = conn
                .query_row(
                    "SELECT local_uid FROM tags WHERE name_upper = ?1 AND local_uid != ?2",
                    params![name_upper, key],
                    |r| r.get(0),
                )
                .optional()?;
            if dup.is_some() {
                return Err(StorageCoreError::conflict(format!(
                    "a tag named '{name}' already exists"
                )));
            }
            conn.execute(
                "UPDATE tags SET name = ?1, name_upper = ?2 WHERE local_uid = ?3",
                params![name, name_upper, key],
            )?;
        }
        if let Some(parent) = update.parent_guid {
            conn.execute(
                "UPDATE tags SET parent_guid = ?1 WHERE local_uid = ?2",
                params![parent.as_ref().map(Guid::as_str), key],
            )?;
        }
        conn.execute("UPDATE tags SET dirty = 1 WHERE local_uid = ?1", params![key])?;
        drop(conn);
        self.find_tag(&key, WhichGuid::LocalUid)
    }

    fn find_tag(&self, key: &str, which: WhichGuid) -> Result<Tag> {
        let conn = self.conn();
        let sql = match which {
            WhichGuid::LocalUid => "SELECT * FROM tags WHERE local_uid = ?1",
            WhichGuid::RemoteGuid => "SELECT * FROM tags WHERE guid = ?1",
        };
        conn.query_row(sql, params![key], row_to_tag)
            .optional()?
            .ok_or_else(|| NotFoundError::tag(key).into())
    }

    fn list_tags(
        &self,
        _filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let order_col = match order {
            SortOrder::CreatedAt | SortOrder::UpdatedAt => "rowid",
            SortOrder::Title | SortOrder::Natural => "name_upper",
        };
        let dir = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let sql = format!(
            "SELECT * FROM tags WHERE is_deleted = 0 ORDER BY {order_col} {dir} LIMIT ?1 OFFSET ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let limit = limit.unwrap_or(u32::MAX) as i64;
        let rows = stmt.query_map(params![limit, offset], row_to_tag)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn delete_tag(&self, local_uid: LocalUid) -> Result<()> {
        // Tags have no remote-deletion privilege for third-party apps (§4.1).
        let conn = self.conn();
        conn.execute(
            "UPDATE tags SET is_deleted = 1, dirty = 1 WHERE local_uid = ?1",
            params![local_uid.to_string()],
        )?;
        Ok(())
    }

    fn expunge_tag(&self, local_uid: LocalUid) -> Result<()> {
        let conn = self.conn();
        let key = local_uid.to_string();
        let is_local: bool = conn
            .query_row(
                "SELECT is_local FROM tags WHERE local_uid = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::tag(&key))?;
        if !is_local {
            return Err(StorageCoreError::expunge_policy(
                "cannot expunge a non-local tag",
            ));
        }
        conn.execute("DELETE FROM tags WHERE local_uid = ?1", params![key])?;
        Ok(())
    }

    // ---- Resource -----------------------------------------------------------

    fn add_resource(&self, new: NewResource) -> Result<Resource> {
        let conn = self.conn();
        let local_uid = LocalUid::new();
        write_resource(&conn, local_uid, &new)?;
        drop(conn);
        self.find_resource(&local_uid.to_string(), WhichGuid::LocalUid, true)
    }

    fn find_resource(
        &self,
        key: &str,
        which: WhichGuid,
        with_binary_body: bool,
    ) -> Result<Resource> {
        let conn = self.conn();
        let sql = match which {
            WhichGuid::LocalUid => "SELECT * FROM resources WHERE local_uid = ?1",
            WhichGuid::RemoteGuid => "SELECT * FROM resources WHERE guid = ?1",
        };
        let mut resource = conn
            .query_row(sql, params![key], row_to_resource)
            .optional()?
            .ok_or_else(|| NotFoundError::resource(key))?;
        if !with_binary_body {
            resource.data.body.clear();
            if let Some(r) = &mut resource.recognition_data {
                r.body.clear();
            }
        }
        resource.attributes = conn
            .query_row(
                "SELECT source_url, timestamp, latitude, longitude, altitude, camera_make, \
                 camera_model, recognition_type, file_name, attachment, application_data \
                 FROM resource_attributes WHERE resource_local_uid = ?1",
                params![resource.local_uid.to_string()],
                |r| {
                    Ok(ResourceAttributes {
                        source_url: r.get(0)?,
                        timestamp: opt_ts(r.get(1)?),
                        latitude: r.get(2)?,
                        longitude: r.get(3)?,
                        altitude: r.get(4)?,
                        camera_make: r.get(5)?,
                        camera_model: r.get(6)?,
                        recognition_type: r.get(7)?,
                        file_name: r.get(8)?,
                        attachment: r.get(9)?,
                        application_data: parse_string_map(r.get(10)?),
                    })
                },
            )
            .optional()?;
        Ok(resource)
    }

    fn list_resources_for_note(&self, note_local_uid: LocalUid) -> Result<Vec<Resource>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT local_uid FROM resources WHERE note_local_uid = ?1 ORDER BY index_in_note ASC",
        )?;
        let uids: Vec<String> = stmt
            .query_map(params![note_local_uid.to_string()], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);
        uids.into_iter()
            .map(|uid| self.find_resource(&uid, WhichGuid::LocalUid, true))
            .collect()
    }

    fn expunge_resource(&self, local_uid: LocalUid) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM resources WHERE local_uid = ?1",
            params![local_uid.to_string()],
        )?;
        Ok(())
    }

    // ---- SavedSearch --------------------------------------------------------

    fn count_saved_searches(&self) -> Result<u64> {
        let conn = self.conn();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM saved_searches", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    fn add_saved_search(&self, new: NewSavedSearch) -> Result<SavedSearch> {
        let conn = self.conn();
        let name_upper = new.name.to_uppercase();
        let dup: Option<String> = conn
            .query_row(
                "SELECT local_uid FROM saved_searches WHERE name_upper = ?1",
                params![name_upper],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(StorageCoreError::conflict(format!(
                "a saved search named '{}' already exists",
                new.name
            )));
        }
        let local_uid = LocalUid::new();
        conn.execute(
            "INSERT INTO saved_searches (local_uid, guid, name, name_upper, query, format, \
             include_account, include_personal_linked_notebooks, \
             include_business_linked_notebooks, dirty, is_local) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'user_query', ?6, ?7, ?8, 1, 1)",
            params![
                local_uid.to_string(),
                new.guid.as_ref().map(Guid::as_str),
                new.name,
                name_upper,
                new.query,
                new.include_account,
                new.include_personal_linked_notebooks,
                new.include_business_linked_notebooks,
            ],
        )?;
        drop(conn);
        self.find_saved_search(&local_uid.to_string(), WhichGuid::LocalUid)
    }

    fn update_saved_search(
        &self,
        local_uid: LocalUid,
        update: SavedSearchUpdate,
    ) -> Result<SavedSearch> {
        let conn = self.conn();
        let key = local_uid.to_string();
        if let Some(name) = &update.name {
            let name_upper = name.to_uppercase();
            let dup: Option<String> = conn
                .query_row(
                    "SELECT local_uid FROM saved_searches WHERE name_upper = ?1 AND local_uid != ?2",
                    params![name_upper, key],
                    |r| r.get(0),
                )
                .optional()?;
            if dup.is_some() {
                return Err(StorageCoreError::conflict(format!(
                    "a saved search named '{name}' already exists"
                )));
            }
            conn.execute(
                "UPDATE saved_searches SET name = ?1, name_upper = ?2 WHERE local_uid = ?3",
                params![name, name_upper, key],
            )?;
        }
        if let Some(query) = &update.query {
            conn.execute(
                "UPDATE saved_searches SET query = ?1 WHERE local_uid = ?2",
                params![query, key],
            )?;
        }
        if let Some(favorited) = update.favorited {
            conn.execute(
                "UPDATE saved_searches SET favorited = ?1 WHERE local_uid = ?2",
                params![favorited, key],
            )?;
        }
        conn.execute(
            "UPDATE saved_searches SET dirty = 1 WHERE local_uid = ?1",
            params![key],
        )?;
        drop(conn);
        self.find_saved_search(&key, WhichGuid::LocalUid)
    }

    fn find_saved_search(&self, key: &str, which: WhichGuid) -> Result<SavedSearch> {
        let conn = self.conn();
        let sql = match which {
            WhichGuid::LocalUid => "SELECT * FROM saved_searches WHERE local_uid = ?1",
            WhichGuid::RemoteGuid => "SELECT * FROM saved_searches WHERE guid = ?1",
        };
        conn.query_row(sql, params![key], row_to_saved_search)
            .optional()?
            .ok_or_else(|| NotFoundError::saved_search(key).into())
    }

    fn list_saved_searches(
        &self,
        _filter: &ListFilter,
        limit: Option<u32>,
        offset: u32,
        order: SortOrder,
        direction: SortDirection,
    ) -> Result<Vec<SavedSearch>> {
        let conn = self.conn();
        let order_col = match order {
            SortOrder::Title | SortOrder::Natural => "name_upper",
            SortOrder::CreatedAt | SortOrder::UpdatedAt => "rowid",
        };
        let dir = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        let sql = format!("SELECT * FROM saved_searches ORDER BY {order_col} {dir} LIMIT ?1 OFFSET ?2");
        let mut stmt = conn.prepare(&sql)?;
        let limit = limit.unwrap_or(u32::MAX) as i64;
        let rows = stmt.query_map(params![limit, offset], row_to_saved_search)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn expunge_saved_search(&self, local_uid: LocalUid) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM saved_searches WHERE local_uid = ?1",
            params![local_uid.to_string()],
        )?;
        Ok(())
    }

    // ---- User -----------------------------------------------------------------

    fn add_user(&self, user: User) -> Result<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO users (id, username, email, privilege_level, \
             creation_timestamp, modification_timestamp, deletion_timestamp, is_active) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.username,
                user.email,
                user.privilege_level,
                user.creation_timestamp.map(|t| t.as_millis()),
                user.modification_timestamp.map(|t| t.as_millis()),
                user.deletion_timestamp.map(|t| t.as_millis()),
                user.is_active,
            ],
        )?;
        self.find_user(user.id)
    }

    fn find_user(&self, id: i64) -> Result<User> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, privilege_level, creation_timestamp, \
             modification_timestamp, deletion_timestamp, is_active FROM users WHERE id = ?1",
            params![id],
            |r| {
                Ok(User {
                    id: r.get(0)?,
                    username: r.get(1)?,
                    email: r.get(2)?,
                    privilege_level: r.get(3)?,
                    creation_timestamp: opt_ts(r.get(4)?),
                    modification_timestamp: opt_ts(r.get(5)?),
                    deletion_timestamp: opt_ts(r.get(6)?),
                    is_active: r.get(7)?,
                    attributes: None,
                    accounting: None,
                    premium_info: None,
                    business_info: None,
                })
            },
        )
        .optional()?
        .ok_or_else(|| NotFoundError::user(id).into())
    }

    fn delete_user(&self, user: User) -> Result<()> {
        // The upstream delete_user requires deletion_timestamp to already be
        // set by the caller; this is preserved rather than "fixed" (§9).
        if user.deletion_timestamp.is_none() {
            return Err(StorageCoreError::expunge_policy(
                "delete_user requires deletion_timestamp to be set by the caller",
            ));
        }
        let conn = self.conn();
        conn.execute(
            "UPDATE users SET deletion_timestamp = ?1, is_active = 0 WHERE id = ?2",
            params![user.deletion_timestamp.unwrap().as_millis(), user.id],
        )?;
        Ok(())
    }

    fn expunge_user(&self, id: i64) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        local_uid: LocalUid(row.get::<_, String>("local_uid")?.parse().unwrap_or_default()),
        guid: opt_guid(row.get("guid")?),
        update_sequence_num: row.get("update_sequence_num")?,
        name: row.get("name")?,
        name_upper: row.get("name_upper")?,
        parent_guid: opt_guid(row.get("parent_guid")?),
        dirty: row.get("dirty")?,
        is_local: row.get("is_local")?,
        is_deleted: row.get("is_deleted")?,
    })
}

fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        local_uid: LocalUid(row.get::<_, String>("local_uid")?.parse().unwrap_or_default()),
        guid: opt_guid(row.get("guid")?),
        update_sequence_num: row.get("update_sequence_num")?,
        notebook_local_uid: LocalUid(
            row.get::<_, String>("notebook_local_uid")?.parse().unwrap_or_default(),
        ),
        notebook_guid: opt_guid(row.get("notebook_guid")?),
        title: row.get("title")?,
        content: row.get("content")?,
        creation_timestamp: opt_ts(row.get("creation_timestamp")?),
        modification_timestamp: opt_ts(row.get("modification_timestamp")?),
        deletion_timestamp: opt_ts(row.get("deletion_timestamp")?),
        is_active: row.get("is_active")?,
        thumbnail: row.get("thumbnail")?,
        tag_guids: Vec::new(),
        attributes: None,
        favorited: row.get("favorited")?,
        dirty: row.get("dirty")?,
        is_local: row.get("is_local")?,
    })
}

fn row_to_saved_search(row: &rusqlite::Row) -> rusqlite::Result<SavedSearch> {
    let format_str: String = row.get("format")?;
    Ok(SavedSearch {
        local_uid: LocalUid(row.get::<_, String>("local_uid")?.parse().unwrap_or_default()),
        guid: opt_guid(row.get("guid")?),
        name: row.get("name")?,
        name_upper: row.get("name_upper")?,
        query: row.get("query")?,
        format: if format_str == "sexp" {
            SearchQueryFormat::Sexp
        } else {
            SearchQueryFormat::UserQuery
        },
        update_sequence_num: row.get("update_sequence_num")?,
        include_account: row.get("include_account")?,
        include_personal_linked_notebooks: row.get("include_personal_linked_notebooks")?,
        include_business_linked_notebooks: row.get("include_business_linked_notebooks")?,
        favorited: row.get("favorited")?,
        dirty: row.get("dirty")?,
        is_local: row.get("is_local")?,
    })
}

fn row_to_resource(row: &rusqlite::Row) -> rusqlite::Result<Resource> {
    let recognition_body: Option<Vec<u8>> = row.get("recognition_body")?;
    let recognition_data = recognition_body.map(|body| DataBody {
        body,
        size: row.get::<_, Option<i64>>("recognition_size").ok().flatten().unwrap_or(0) as u64,
        hash: row.get::<_, Option<Vec<u8>>>("recognition_hash").ok().flatten().unwrap_or_default(),
    });
    Ok(Resource {
        local_uid: LocalUid(row.get::<_, String>("local_uid")?.parse().unwrap_or_default()),
        guid: opt_guid(row.get("guid")?),
        note_local_uid: LocalUid(
            row.get::<_, String>("note_local_uid")?.parse().unwrap_or_default(),
        ),
        note_guid: opt_guid(row.get("note_guid")?),
        update_sequence_num: row.get("update_sequence_num")?,
        data: DataBody {
            body: row.get("data_body")?,
            size: row.get::<_, i64>("data_size")? as u64,
            hash: row.get("data_hash")?,
        },
        mime: row.get("mime")?,
        width: row.get("width")?,
        height: row.get("height")?,
        recognition_data,
        index_in_note: row.get("index_in_note")?,
        attributes: None,
    })
}

fn write_note_tags(conn: &Connection, note_local_uid: LocalUid, tag_guids: &[Guid]) -> Result<()> {
    for (idx, guid) in tag_guids.iter().enumerate() {
        let tag_local_uid: String = conn
            .query_row(
                "SELECT local_uid FROM tags WHERE guid = ?1",
                params![guid.as_str()],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| NotFoundError::tag(guid.as_str()))?;
        conn.execute(
            "INSERT OR REPLACE INTO note_tags (note_local_uid, tag_local_uid, index_in_note) \
             VALUES (?1, ?2, ?3)",
            params![note_local_uid.to_string(), tag_local_uid, idx as i64],
        )?;
    }
    Ok(())
}

fn write_note_attributes(
    conn: &Connection,
    note_local_uid: LocalUid,
    attrs: &NoteAttributes,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO note_attributes (note_local_uid, subject_date, latitude, \
         longitude, altitude, author, source, source_url, source_application, reminder_time, \
         reminder_done_time, reminder_order, place_name, content_class, last_editor_id, \
         application_data_keys_only, application_data_full_map, classifications) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            note_local_uid.to_string(),
            attrs.subject_date.map(|t| t.as_millis()),
            attrs.latitude,
            attrs.longitude,
            attrs.altitude,
            attrs.author,
            attrs.source,
            attrs.source_url,
            attrs.source_application,
            attrs.reminder_time.map(|t| t.as_millis()),
            attrs.reminder_done_time.map(|t| t.as_millis()),
            attrs.reminder_order,
            attrs.place_name,
            attrs.content_class,
            attrs.last_editor_id,
            json_string_set(&attrs.application_data_keys_only),
            json_string_map(&attrs.application_data_full_map),
            json_string_map(&attrs.classifications),
        ],
    )?;
    Ok(())
}

fn write_resource(conn: &Connection, local_uid: LocalUid, new: &NewResource) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO resources (local_uid, guid, note_local_uid, update_sequence_num, \
         data_body, data_size, data_hash, mime, width, height, recognition_body, \
         recognition_size, recognition_hash, index_in_note) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            local_uid.to_string(),
            new.guid.as_ref().map(Guid::as_str),
            new.note_local_uid.to_string(),
            None::<i32>,
            new.data.body,
            new.data.size as i64,
            new.data.hash,
            new.mime,
            new.width,
            new.height,
            new.recognition_data.as_ref().map(|d| d.body.clone()),
            new.recognition_data.as_ref().map(|d| d.size as i64),
            new.recognition_data.as_ref().map(|d| d.hash.clone()),
            new.index_in_note,
        ],
    )?;
    if let Some(attrs) = &new.attributes {
        conn.execute(
            "INSERT OR REPLACE INTO resource_attributes (resource_local_uid, source_url, \
             timestamp, latitude, longitude, altitude, camera_make, camera_model, \
             recognition_type, file_name, attachment, application_data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                local_uid.to_string(),
                attrs.source_url,
                attrs.timestamp.map(|t| t.as_millis()),
                attrs.latitude,
                attrs.longitude,
                attrs.altitude,
                attrs.camera_make,
                attrs.camera_model,
                attrs.recognition_type,
                attrs.file_name,
                attrs.attachment,
                json_string_map(&attrs.application_data),
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_storage() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path());
        let storage = SqliteStorage::open("alice", 1, &config, false).unwrap();
        (dir, storage)
    }

    #[test]
    fn add_and_find_notebook_roundtrips() {
        let (_dir, storage) = open_test_storage();
        let created = storage
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                is_default: true,
                ..Default::default()
            })
            .unwrap();
        let found = storage
            .find_notebook(&created.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap();
        assert_eq!(found.name, "Inbox");
        assert!(found.is_default);
    }

    #[test]
    fn duplicate_notebook_name_is_conflict() {
        let (_dir, storage) = open_test_storage();
        storage
            .add_notebook(NewNotebook {
                name: "A".into(),
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .add_notebook(NewNotebook {
                name: "a".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn note_created_in_notebook_has_matching_notebook_uid() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                ..Default::default()
            })
            .unwrap();
        let note = storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "Hello".into(),
                content: "<en-note>hi</en-note>".into(),
                ..Default::default()
            })
            .unwrap();
        let found = storage
            .find_note(&note.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap();
        assert_eq!(found.title, "Hello");
        assert_eq!(found.notebook_local_uid, notebook.local_uid);
    }

    #[test]
    fn note_creation_respects_no_create_notes_restriction() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Locked".into(),
                restrictions: NotebookRestrictions {
                    no_create_notes: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "x".into(),
                content: "x".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_restriction());
    }

    #[test]
    fn tagging_a_note_preserves_order() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                ..Default::default()
            })
            .unwrap();
        let t1 = storage.add_tag(NewTag { name: "T1".into(), ..Default::default() }).unwrap();
        let t2 = storage.add_tag(NewTag { name: "T2".into(), ..Default::default() }).unwrap();
        let note = storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "N1".into(),
                content: "c".into(),
                tag_guids: vec![t1.guid.clone().unwrap(), t2.guid.clone().unwrap()],
                ..Default::default()
            })
            .unwrap();
        let found = storage
            .find_note(&note.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap();
        assert_eq!(found.tag_guids, vec![t1.guid.unwrap(), t2.guid.unwrap()]);
    }

    #[test]
    fn expunging_notebook_cascades_to_notes() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Inbox".into(),
                ..Default::default()
            })
            .unwrap();
        let note = storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                title: "N".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap();
        storage.expunge_notebook(notebook.local_uid).unwrap();
        let err = storage
            .find_note(&note.local_uid.to_string(), WhichGuid::LocalUid)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_notebook_respects_no_update_notebook_restriction() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Locked".into(),
                restrictions: NotebookRestrictions {
                    no_update_notebook: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .update_notebook(notebook.local_uid, NotebookUpdate {
                stack: Some(Some("Work".into())),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_restriction());
    }

    #[test]
    fn update_notebook_respects_no_rename_notebook_restriction() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook {
                name: "Locked".into(),
                restrictions: NotebookRestrictions {
                    no_rename_notebook: true,
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .update_notebook(notebook.local_uid, NotebookUpdate {
                name: Some("New name".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_restriction());
    }

    #[test]
    fn duplicate_note_guid_is_conflict() {
        let (_dir, storage) = open_test_storage();
        let notebook = storage
            .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
            .unwrap();
        storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                guid: Some(Guid::new("note-guid-1")),
                title: "First".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .add_note(NewNote {
                notebook_local_uid: notebook.local_uid,
                guid: Some(Guid::new("note-guid-1")),
                title: "Second".into(),
                content: "c".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn duplicate_tag_guid_is_conflict() {
        let (_dir, storage) = open_test_storage();
        storage
            .add_tag(NewTag {
                guid: Some(Guid::new("tag-guid-1")),
                name: "Work".into(),
                ..Default::default()
            })
            .unwrap();
        let err = storage
            .add_tag(NewTag {
                guid: Some(Guid::new("tag-guid-1")),
                name: "Personal".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
