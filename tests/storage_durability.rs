//! Durability integration tests for the SQLite-backed storage engine.
//!
//! Writes through [`StorageCore`] are committed transactionally (see
//! `storage/transaction.rs`); these tests verify that committed data is
//! still present after closing and reopening the same on-disk database,
//! both via a graceful `close()` and via simply dropping the handle.

use qnote_storage::{Config, NewNotebook, StorageCore, WhichGuid};
use tempfile::tempdir;

#[test]
fn committed_data_survives_graceful_close_and_reopen() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path());

    let core = StorageCore::open("alice", 1, config.clone()).unwrap();
    let notebook = core
        .add_notebook(NewNotebook { name: "Durable".into(), ..Default::default() })
        .unwrap();
    core.close().unwrap();

    let core = StorageCore::open("alice", 1, config).unwrap();
    let found = core
        .find_notebook(notebook.local_uid.to_string(), WhichGuid::LocalUid)
        .unwrap();
    assert_eq!(found.name, "Durable");
    core.close().unwrap();
}

#[test]
fn committed_data_survives_ungraceful_drop() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path());

    let notebook_uid = {
        let core = StorageCore::open("alice", 1, config.clone()).unwrap();
        let notebook = core
            .add_notebook(NewNotebook { name: "Crash-safe".into(), ..Default::default() })
            .unwrap();
        // Dropped here without calling `close()`.
        notebook.local_uid
    };

    let core = StorageCore::open("alice", 1, config).unwrap();
    let found = core.find_notebook(notebook_uid.to_string(), WhichGuid::LocalUid).unwrap();
    assert_eq!(found.name, "Crash-safe");
    core.close().unwrap();
}

#[test]
fn separate_accounts_get_independent_databases() {
    let dir = tempdir().unwrap();

    let alice = StorageCore::open("alice", 1, Config::new(dir.path())).unwrap();
    alice
        .add_notebook(NewNotebook { name: "Alice's notebook".into(), ..Default::default() })
        .unwrap();
    alice.close().unwrap();

    let bob = StorageCore::open("bob", 2, Config::new(dir.path())).unwrap();
    let bob_notebooks = bob
        .list_notebooks(
            qnote_storage::ListFilter::all(),
            None,
            0,
            qnote_storage::SortOrder::Natural,
            qnote_storage::SortDirection::Ascending,
        )
        .unwrap();
    assert!(bob_notebooks.is_empty());
    bob.close().unwrap();
}
