use std::fs;
use std::path::Path;

use takenote_core::{Document, DocumentStore, NodeChange, StoreError};
use takenote_notebook::{FileStore, NOTEBOOK_FILE};
use tempfile::tempdir;

#[test]
fn save_and_reload_roundtrip_keeps_ids_and_layout() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("Journal");
    let mut store = FileStore::new();

    let mut notebook = store.create(&path).expect("create");
    let root = notebook.tree().root_id();
    let trips = notebook.new_folder_child(root, "Trips").expect("folder");
    let lisbon = notebook.new_page_child(trips, "Lisbon").expect("page");
    notebook.save().expect("save");

    assert!(path.join("Trips").is_dir());
    assert!(path.join("Trips").join("Lisbon").join("page.html").is_file());

    let reloaded = store.load(&path).expect("reload");
    assert_eq!(reloaded.title(), "Journal");
    assert_eq!(reloaded.tree().children(root), &[trips]);
    assert_eq!(reloaded.tree().title(lisbon), Some("Lisbon"));
    assert_eq!(
        reloaded.tree().data_file_path(lisbon).unwrap(),
        path.join("Trips/Lisbon/page.html")
    );
}

#[test]
fn save_preserves_existing_page_content() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nb");
    let mut store = FileStore::new();
    let mut notebook = store.create(&path).expect("create");
    let root = notebook.tree().root_id();
    let page = notebook.new_page_child(root, "Draft").expect("page");
    notebook.save().expect("first save");

    let data_file = notebook.tree().data_file_path(page).unwrap();
    fs::write(&data_file, "<p>keep me</p>").expect("write page");
    notebook.save().expect("second save");

    assert_eq!(fs::read_to_string(&data_file).unwrap(), "<p>keep me</p>");
}

#[test]
fn create_refuses_existing_notebook() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nb");
    let mut store = FileStore::new();
    store.create(&path).expect("create");

    let err = store.create(&path).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn newer_format_version_is_reported_before_parsing() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join(NOTEBOOK_FILE),
        r#"{"version": 3, "layout": "something new"}"#,
    )
    .expect("write");

    let err = FileStore::new().load(temp.path()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Version {
            found: 3,
            readable: 2
        }
    ));
}

#[test]
fn missing_notebook_is_an_io_error_with_path() {
    let temp = tempdir().expect("tempdir");
    let err = FileStore::new()
        .load(&temp.path().join("absent"))
        .unwrap_err();
    match err {
        StoreError::Io { path, .. } => assert!(path.ends_with(Path::new("absent").join(NOTEBOOK_FILE))),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn broken_tree_is_invalid() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join(NOTEBOOK_FILE),
        r#"{
            "version": 2,
            "title": "Broken",
            "root": 1,
            "nodes": [
                {"id": 1, "kind": {"type": "folder"}, "title": "Broken", "dir_name": "", "children": [2]}
            ]
        }"#,
    )
    .expect("write");

    let err = FileStore::new().load(temp.path()).unwrap_err();
    assert!(matches!(err, StoreError::Invalid { ref reason, .. } if reason.contains("node 2")));
}

#[test]
fn mutations_emit_change_notifications() {
    let temp = tempdir().expect("tempdir");
    let mut notebook = FileStore::new()
        .create(&temp.path().join("nb"))
        .expect("create");
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::<NodeChange>::new()));
    let sink = seen.clone();
    notebook
        .changes()
        .subscribe(move |change| sink.borrow_mut().push(change.clone()));

    let root = notebook.tree().root_id();
    let folder = notebook.new_folder_child(root, "Ideas").expect("folder");
    notebook.set_title(folder, "Big ideas").expect("rename");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].nodes, vec![root]);
    assert_eq!(seen[1].nodes, vec![folder]);
    assert!(!seen[1].recursive);
}

#[test]
fn escaping_directory_names_are_rejected_before_saving() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nb");
    fs::create_dir_all(&path).expect("mkdir");
    fs::write(
        path.join(NOTEBOOK_FILE),
        r#"{
            "version": 2,
            "title": "nb",
            "root": 1,
            "nodes": [
                {"id": 1, "kind": {"type": "folder"}, "title": "nb", "dir_name": "", "children": [2]},
                {"id": 2, "kind": {"type": "page"}, "title": "Out", "dir_name": "../escaped", "parent": 1}
            ]
        }"#,
    )
    .expect("write");

    let err = FileStore::new().load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Invalid { ref reason, .. } if reason.contains("../escaped")));
    assert!(!temp.path().join("escaped").exists());
}

#[test]
fn page_file_outside_its_directory_is_rejected() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join(NOTEBOOK_FILE),
        r#"{
            "version": 2,
            "title": "nb",
            "root": 1,
            "nodes": [
                {"id": 1, "kind": {"type": "folder"}, "title": "nb", "dir_name": "", "children": [2]},
                {"id": 2, "kind": {"type": "page", "data_file": "../../x.html"}, "title": "P", "dir_name": "P", "parent": 1}
            ]
        }"#,
    )
    .expect("write");

    let err = FileStore::new().load(temp.path()).unwrap_err();
    assert!(matches!(err, StoreError::Invalid { ref reason, .. } if reason.contains("content file")));
}
