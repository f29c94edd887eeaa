use std::fs;
use std::path::PathBuf;
use takenote_settings::{ExternalApp, Preferences, PreferencesStore, ViewMode};
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    assert!(store.preferences().notebook.autosave_enabled);
    assert_eq!(store.preferences().notebook.autosave_interval_secs, 10);
    assert_eq!(store.preferences().ui.view_mode, ViewMode::Vertical);
    assert!(store.preferences().notebook.default_dir.is_none());
    assert!(!path.exists(), "loading defaults must not create the file");
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("preferences.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .update(|prefs| {
            prefs.notebook.autosave_enabled = false;
            prefs.notebook.autosave_interval_secs = 45;
            prefs.notebook.default_dir = Some(PathBuf::from("/home/me/notes"));
            prefs.ui.view_mode = ViewMode::Horizontal;
            prefs.set_external_app(ExternalApp::new("image_viewer", "Image Viewer", "feh"));
        })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    let prefs = reloaded.preferences();
    assert!(!prefs.notebook.autosave_enabled);
    assert_eq!(prefs.notebook.autosave_interval_secs, 45);
    assert_eq!(
        prefs.notebook.default_dir.as_deref(),
        Some(std::path::Path::new("/home/me/notes"))
    );
    assert_eq!(prefs.ui.view_mode, ViewMode::Horizontal);
    assert_eq!(prefs.external_app("image_viewer").unwrap().program, "feh");
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn overwrite_clamps_autosave_interval() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let mut store = PreferencesStore::load(&path).expect("default");
    let mut prefs = store.preferences().clone();
    prefs.notebook.autosave_interval_secs = 0;
    store.overwrite(prefs).expect("overwrite");
    assert_eq!(store.preferences().notebook.autosave_interval_secs, 10);

    let mut prefs = store.preferences().clone();
    prefs.notebook.autosave_interval_secs = 90_000;
    store.overwrite(prefs).expect("overwrite");
    assert_eq!(store.preferences().notebook.autosave_interval_secs, 3600);
}

#[test]
fn legacy_version_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(
        &path,
        r#"{
            "version": 0,
            "notebook": {
                "autosave_enabled": false,
                "autosave_interval_secs": 0
            },
            "ui": { "view_mode": "horizontal" }
        }"#,
    )
    .expect("write legacy prefs");

    let store = PreferencesStore::load(&path).expect("load legacy file");
    let prefs = store.preferences();
    assert_eq!(prefs.version, 2, "legacy preferences should be upgraded");
    assert!(!prefs.notebook.autosave_enabled);
    assert_eq!(
        prefs.notebook.autosave_interval_secs, 10,
        "autosave interval should fall back to default when legacy data is zero"
    );
    assert_eq!(prefs.ui.view_mode, ViewMode::Horizontal);
    assert!(
        prefs.external_app("image_viewer").is_some(),
        "missing external app table should get the default entries"
    );
}

#[test]
fn malformed_file_reports_path() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, "{ not json").expect("write");

    let err = PreferencesStore::load(&path).unwrap_err();
    assert!(err.to_string().contains("preferences.json"));
}
