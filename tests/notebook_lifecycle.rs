//! Notebook lifecycle integration tests: add, update, delete/expunge, and
//! the default/last-used notebook invariants.

use qnote_storage::{Config, NewNotebook, NotebookUpdate, StorageCore, WhichGuid};
use tempfile::tempdir;

fn open_core(path: &std::path::Path) -> StorageCore {
    StorageCore::open("alice", 1, Config::new(path)).unwrap()
}

#[test]
fn add_then_find_by_local_uid() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let created = core
        .add_notebook(NewNotebook {
            name: "Personal".into(),
            ..Default::default()
        })
        .unwrap();
    let found = core
        .find_notebook(created.local_uid.to_string(), WhichGuid::LocalUid)
        .unwrap();
    assert_eq!(found.name, "Personal");
    assert!(found.is_local);
    core.close().unwrap();
}

#[test]
fn update_renames_notebook() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook {
            name: "Work".into(),
            ..Default::default()
        })
        .unwrap();
    let updated = core
        .update_notebook(notebook.local_uid, NotebookUpdate {
            name: Some("Work Archive".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(updated.name, "Work Archive");
    core.close().unwrap();
}

#[test]
fn delete_local_notebook_expunges_it() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook {
            name: "Scratch".into(),
            ..Default::default()
        })
        .unwrap();
    core.delete_notebook(notebook.local_uid).unwrap();

    let err = core
        .find_notebook(notebook.local_uid.to_string(), WhichGuid::LocalUid)
        .unwrap_err();
    assert!(err.is_not_found());
    core.close().unwrap();
}

#[test]
fn list_notebooks_reflects_insertions() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    for name in ["A", "B", "C"] {
        core.add_notebook(NewNotebook { name: name.into(), ..Default::default() }).unwrap();
    }
    let all = core
        .list_notebooks(
            qnote_storage::ListFilter::all(),
            None,
            0,
            qnote_storage::SortOrder::Natural,
            qnote_storage::SortDirection::Ascending,
        )
        .unwrap();
    assert_eq!(all.len(), 3);
    core.close().unwrap();
}
