//! Note/tag integration tests: tagging a note by guid, counting notes per
//! tag, and the favorited flag round-tripping through an update.

use qnote_storage::{Config, Guid, NewNote, NewNotebook, NewTag, NoteUpdate, StorageCore, WhichGuid};
use tempfile::tempdir;

fn open_core(path: &std::path::Path) -> StorageCore {
    StorageCore::open("alice", 1, Config::new(path)).unwrap()
}

#[test]
fn tagging_a_note_is_reflected_in_tag_guids_and_count() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
        .unwrap();
    let tag = core
        .add_tag(NewTag {
            guid: Some(Guid::new("tag-guid-1")),
            name: "work".into(),
            ..Default::default()
        })
        .unwrap();
    let tag_guid = tag.guid.clone().unwrap();

    let note = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Standup notes".into(),
            content: "<en-note>...</en-note>".into(),
            tag_guids: vec![tag_guid.clone()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(note.tag_guids, vec![tag_guid.clone()]);

    let count = core
        .count_notes(qnote_storage::ListFilter::by_tag(tag_guid))
        .unwrap();
    assert_eq!(count, 1);
    core.close().unwrap();
}

#[test]
fn favorited_flag_roundtrips_through_update() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
        .unwrap();
    let note = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Read later".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();
    assert!(!note.favorited);

    let updated = core
        .update_note(note.local_uid, NoteUpdate {
            favorited: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert!(updated.favorited);

    let refetched = core.find_note(note.local_uid.to_string(), WhichGuid::LocalUid).unwrap();
    assert!(refetched.favorited);
    core.close().unwrap();
}
