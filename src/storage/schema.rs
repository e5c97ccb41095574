//! Relational schema definitions and versioning.
//!
//! This module defines the table graph for the SQLite-backed storage
//! engine. All `CREATE TABLE` statements are compile-time string constants
//! executed as one batch on open, so the shapes described here and the
//! shapes the engine relies on can never drift apart.
//!
//! # Schema Versioning
//!
//! The schema version is stored as a `user_version` pragma. Opening an
//! existing database newer than [`SCHEMA_VERSION`] fails with
//! [`crate::error::DbError::SchemaVersionMismatch`] rather than silently
//! reading a shape this build doesn't understand (§6: "a future
//! implementation should carry a `schema_version` pragma and refuse to open
//! a newer database than it understands").
//!
//! # Table Layout
//!
//! ```text
//! notebooks ──< notes ──< note_tags >── tags
//!     │            │
//!     │            └──< resources
//!     ├──< notebook_restrictions (1:1)
//!     ├──< notebook_publishing (1:1)
//!     └──< shared_notebooks
//! note_attributes (1:1 with notes)
//! resource_attributes (1:1 with resources)
//! users ──< user_attributes / accounting / premium_info / business_user_info (1:1)
//! linked_notebooks, saved_searches (standalone)
//! ```

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Current schema version. Increment when making a breaking change to the
/// table graph; `SqliteStorage::open` refuses to open a database whose
/// `user_version` exceeds this.
pub const SCHEMA_VERSION: u32 = 1;

/// Default stable on-disk file name within each per-account directory.
/// The name itself carries no semantic meaning; any stable name would do.
pub const DATABASE_FILE_NAME: &str = "storage.sqlite";

/// All `CREATE TABLE IF NOT EXISTS`/index statements, executed once as a
/// batch via `Connection::execute_batch` on open.
pub const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notebooks (
    local_uid               TEXT PRIMARY KEY,
    guid                    TEXT UNIQUE,
    update_sequence_num     INTEGER,
    name                    TEXT NOT NULL,
    name_upper              TEXT NOT NULL UNIQUE,
    creation_timestamp      INTEGER,
    modification_timestamp  INTEGER,
    is_default              INTEGER NOT NULL DEFAULT 0,
    is_last_used            INTEGER NOT NULL DEFAULT 0,
    stack                   TEXT,
    contact_user_id         INTEGER,
    dirty                   INTEGER NOT NULL DEFAULT 1,
    is_local                INTEGER NOT NULL DEFAULT 1
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_notebooks_is_default
    ON notebooks (is_default) WHERE is_default = 1;
CREATE UNIQUE INDEX IF NOT EXISTS idx_notebooks_is_last_used
    ON notebooks (is_last_used) WHERE is_last_used = 1;

CREATE TABLE IF NOT EXISTS notebook_restrictions (
    notebook_local_uid      TEXT PRIMARY KEY REFERENCES notebooks(local_uid) ON DELETE CASCADE,
    no_read_notes           INTEGER NOT NULL DEFAULT 0,
    no_create_notes         INTEGER NOT NULL DEFAULT 0,
    no_update_notes         INTEGER NOT NULL DEFAULT 0,
    no_expunge_notes        INTEGER NOT NULL DEFAULT 0,
    no_share_notes          INTEGER NOT NULL DEFAULT 0,
    no_rename_notebook      INTEGER NOT NULL DEFAULT 0,
    no_update_notebook      INTEGER NOT NULL DEFAULT 0,
    no_expunge_notebook     INTEGER NOT NULL DEFAULT 0,
    no_create_tags          INTEGER NOT NULL DEFAULT 0,
    no_update_tags          INTEGER NOT NULL DEFAULT 0,
    no_expunge_tags         INTEGER NOT NULL DEFAULT 0,
    no_set_default_notebook INTEGER NOT NULL DEFAULT 0,
    no_publish_to_public    INTEGER NOT NULL DEFAULT 0,
    no_send_to_business     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS notebook_publishing (
    notebook_local_uid      TEXT PRIMARY KEY REFERENCES notebooks(local_uid) ON DELETE CASCADE,
    uri                     TEXT,
    order_num               INTEGER,
    ascending               INTEGER,
    public_description      TEXT
);

CREATE TABLE IF NOT EXISTS notebook_business (
    notebook_local_uid      TEXT PRIMARY KEY REFERENCES notebooks(local_uid) ON DELETE CASCADE,
    notebook_description    TEXT,
    required_privilege      INTEGER
);

CREATE TABLE IF NOT EXISTS shared_notebooks (
    share_id                          INTEGER PRIMARY KEY,
    user_id                           INTEGER,
    notebook_guid                     TEXT NOT NULL REFERENCES notebooks(guid) ON DELETE CASCADE,
    email                             TEXT,
    creation_timestamp                INTEGER,
    modification_timestamp           INTEGER,
    privilege                         INTEGER,
    allow_preview                     INTEGER NOT NULL DEFAULT 0,
    recipient_reminder_notify_email   INTEGER NOT NULL DEFAULT 0,
    recipient_reminder_notify_in_app  INTEGER NOT NULL DEFAULT 0,
    index_in_notebook                 INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_shared_notebooks_notebook
    ON shared_notebooks (notebook_guid, index_in_notebook);

CREATE TABLE IF NOT EXISTS linked_notebooks (
    guid                    TEXT PRIMARY KEY,
    update_sequence_num     INTEGER,
    share_name              TEXT,
    share_key               TEXT,
    shard_id                TEXT,
    uri                     TEXT,
    note_store_url          TEXT,
    web_api_url_prefix      TEXT,
    stack                   TEXT,
    business_id             INTEGER
);

CREATE TABLE IF NOT EXISTS tags (
    local_uid               TEXT PRIMARY KEY,
    guid                    TEXT UNIQUE,
    update_sequence_num     INTEGER,
    name                    TEXT NOT NULL,
    name_upper              TEXT NOT NULL UNIQUE,
    parent_guid             TEXT REFERENCES tags(guid) ON DELETE SET NULL,
    dirty                   INTEGER NOT NULL DEFAULT 1,
    is_local                INTEGER NOT NULL DEFAULT 1,
    is_deleted              INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS notes (
    local_uid               TEXT PRIMARY KEY,
    guid                    TEXT UNIQUE,
    update_sequence_num     INTEGER,
    notebook_local_uid      TEXT NOT NULL REFERENCES notebooks(local_uid) ON DELETE CASCADE,
    notebook_guid           TEXT,
    title                   TEXT NOT NULL DEFAULT '',
    content                 TEXT NOT NULL DEFAULT '',
    creation_timestamp      INTEGER,
    modification_timestamp  INTEGER,
    deletion_timestamp      INTEGER,
    is_active               INTEGER NOT NULL DEFAULT 1,
    thumbnail               BLOB,
    favorited               INTEGER NOT NULL DEFAULT 0,
    dirty                   INTEGER NOT NULL DEFAULT 1,
    is_local                INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_notes_notebook ON notes (notebook_local_uid);

CREATE TABLE IF NOT EXISTS note_attributes (
    note_local_uid              TEXT PRIMARY KEY REFERENCES notes(local_uid) ON DELETE CASCADE,
    subject_date                 INTEGER,
    latitude                     REAL,
    longitude                    REAL,
    altitude                     REAL,
    author                       TEXT,
    source                       TEXT,
    source_url                   TEXT,
    source_application           TEXT,
    reminder_time                INTEGER,
    reminder_done_time           INTEGER,
    reminder_order               INTEGER,
    place_name                   TEXT,
    content_class                TEXT,
    last_editor_id               INTEGER,
    application_data_keys_only   TEXT,
    application_data_full_map    TEXT,
    classifications               TEXT
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_local_uid          TEXT NOT NULL REFERENCES notes(local_uid) ON DELETE CASCADE,
    tag_local_uid           TEXT NOT NULL REFERENCES tags(local_uid) ON DELETE CASCADE,
    index_in_note           INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (note_local_uid, tag_local_uid)
);
CREATE INDEX IF NOT EXISTS idx_note_tags_note ON note_tags (note_local_uid, index_in_note);

CREATE TABLE IF NOT EXISTS resources (
    local_uid               TEXT PRIMARY KEY,
    guid                    TEXT UNIQUE,
    note_local_uid          TEXT NOT NULL REFERENCES notes(local_uid) ON DELETE CASCADE,
    note_guid               TEXT,
    update_sequence_num     INTEGER,
    data_body               BLOB NOT NULL,
    data_size               INTEGER NOT NULL,
    data_hash               BLOB NOT NULL,
    mime                    TEXT NOT NULL,
    width                   INTEGER,
    height                  INTEGER,
    recognition_body        BLOB,
    recognition_size        INTEGER,
    recognition_hash        BLOB,
    index_in_note           INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_resources_note ON resources (note_local_uid, index_in_note);

CREATE TABLE IF NOT EXISTS resource_attributes (
    resource_local_uid      TEXT PRIMARY KEY REFERENCES resources(local_uid) ON DELETE CASCADE,
    source_url              TEXT,
    timestamp               INTEGER,
    latitude                REAL,
    longitude               REAL,
    altitude                REAL,
    camera_make             TEXT,
    camera_model            TEXT,
    recognition_type        TEXT,
    file_name               TEXT,
    attachment              INTEGER,
    application_data        TEXT
);

CREATE TABLE IF NOT EXISTS saved_searches (
    local_uid                                TEXT PRIMARY KEY,
    guid                                      TEXT UNIQUE,
    name                                      TEXT NOT NULL,
    name_upper                                TEXT NOT NULL UNIQUE,
    query                                     TEXT NOT NULL,
    format                                    TEXT NOT NULL DEFAULT 'user_query',
    update_sequence_num                       INTEGER,
    include_account                           INTEGER NOT NULL DEFAULT 0,
    include_personal_linked_notebooks         INTEGER NOT NULL DEFAULT 0,
    include_business_linked_notebooks         INTEGER NOT NULL DEFAULT 0,
    favorited                                  INTEGER NOT NULL DEFAULT 0,
    dirty                                      INTEGER NOT NULL DEFAULT 1,
    is_local                                   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS users (
    id                      INTEGER PRIMARY KEY,
    username                TEXT,
    email                   TEXT,
    privilege_level         INTEGER,
    creation_timestamp      INTEGER,
    modification_timestamp  INTEGER,
    deletion_timestamp      INTEGER,
    is_active               INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS user_attributes (
    user_id                 INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    default_location_name   TEXT,
    timezone                TEXT,
    uses_dark_theme         INTEGER
);

CREATE TABLE IF NOT EXISTS user_accounting (
    user_id                         INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    upload_limit                    INTEGER,
    upload_limit_end                INTEGER,
    premium_service_expiration      INTEGER
);

CREATE TABLE IF NOT EXISTS user_premium_info (
    user_id                         INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    premium_subscription_active     INTEGER
);

CREATE TABLE IF NOT EXISTS user_business_info (
    user_id                 INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    business_id             INTEGER,
    business_name           TEXT,
    role                    INTEGER
);
"#;

/// In-memory metadata about the open database, not itself persisted beyond
/// the `user_version` pragma.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version found (or just created) in this database.
    pub schema_version: u32,
    /// When this handle was opened.
    pub opened_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_schema_sql_declares_every_entity_table() {
        for table in [
            "notebooks",
            "notebook_restrictions",
            "shared_notebooks",
            "linked_notebooks",
            "tags",
            "notes",
            "note_attributes",
            "note_tags",
            "resources",
            "resource_attributes",
            "saved_searches",
            "users",
        ] {
            assert!(
                CREATE_SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn cascading_deletes_are_declared_for_dependent_tables() {
        assert!(CREATE_SCHEMA_SQL.matches("ON DELETE CASCADE").count() >= 10);
    }
}
