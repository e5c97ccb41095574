//! Integration tests for the Favorites view-model against a real
//! `StorageCore`, covering refresh, sort, and row removal.

use qnote_storage::{
    Config, FavoritesViewModel, NewNote, NewNotebook, NewSavedSearch, NoteUpdate, SortDirection,
    SortKey, StorageCore,
};
use tempfile::tempdir;

fn open_core(path: &std::path::Path) -> StorageCore {
    StorageCore::open("alice", 1, Config::new(path)).unwrap()
}

#[test]
fn refresh_sort_and_remove_round_trip() {
    let dir = tempdir().unwrap();
    let core = open_core(dir.path());

    let notebook = core
        .add_notebook(NewNotebook { name: "Inbox".into(), ..Default::default() })
        .unwrap();
    let note_a = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Zebra".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();
    let note_b = core
        .add_note(NewNote {
            notebook_local_uid: notebook.local_uid,
            title: "Apple".into(),
            content: "c".into(),
            ..Default::default()
        })
        .unwrap();
    for note in [&note_a, &note_b] {
        core.update_note(note.local_uid, NoteUpdate {
            favorited: Some(true),
            ..Default::default()
        })
        .unwrap();
    }
    let search = core
        .add_saved_search(NewSavedSearch {
            name: "Open tasks".into(),
            query: "tag:todo".into(),
            ..Default::default()
        })
        .unwrap();
    core.update_saved_search(search.local_uid, qnote_storage::SavedSearchUpdate {
        favorited: Some(true),
        ..Default::default()
    })
    .unwrap();

    let mut vm = FavoritesViewModel::new();
    vm.refresh(&core).unwrap();
    assert_eq!(vm.len(), 3);

    vm.sort(SortKey::DisplayName, SortDirection::Ascending);
    let names: Vec<&str> = vm.rows().iter().map(|i| i.display_name.as_str()).collect();
    assert_eq!(names, vec!["Apple", "Open tasks", "Zebra"]);

    vm.remove_rows(&core, 0, 1).unwrap();
    assert_eq!(vm.len(), 2);

    let apple = core
        .find_note(note_b.local_uid.to_string(), qnote_storage::WhichGuid::LocalUid)
        .unwrap();
    assert!(!apple.favorited);
    core.close().unwrap();
}
