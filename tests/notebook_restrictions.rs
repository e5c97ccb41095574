//! Integration tests for notebook restriction enforcement on Notes and Tags.

use qnote_storage::{Config, NewNote, NewNotebook, NotebookRestrictions, StorageCore};
use tempfile::tempdir;

fn open_core(path: &std::path::Path) -> StorageCore {
    StorageCore::open("alice", 1, Config::new(path)).unwrap()
}

#[test]
fn no_create_notes_blocks_add_note() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook {
            name: "Locked".into(),
            restrictions: NotebookRestrictions {
                no_create_notes: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

    let err = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Should fail".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_restriction());
    core.close().unwrap();
}

#[test]
fn no_update_notes_blocks_update() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook { name: "Editable".into(), ..Default::default() })
        .unwrap();
    let note = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Original".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();

    core.update_notebook(notebook.local_uid, qnote_storage::NotebookUpdate {
        restrictions: Some(NotebookRestrictions {
            no_update_notes: true,
            ..Default::default()
        }),
        ..Default::default()
    })
    .unwrap();

    let err = core
        .update_note(note.local_uid, qnote_storage::NoteUpdate {
            title: Some("Changed".into()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.is_restriction());
    core.close().unwrap();
}
