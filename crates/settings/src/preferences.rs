use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const PREFERENCES_VERSION: u32 = 2;
const MIN_AUTOSAVE_SECS: u64 = 1;
const MAX_AUTOSAVE_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub notebook: NotebookPreferences,
    #[serde(default)]
    pub ui: UiPreferences,
    #[serde(default = "default_external_apps")]
    pub external_apps: Vec<ExternalApp>,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            notebook: NotebookPreferences::default(),
            ui: UiPreferences::default(),
            external_apps: default_external_apps(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.notebook.sanitize();

        // Drop blank keys and keep the first entry for each key.
        let mut seen = Vec::new();
        self.external_apps.retain(|app| {
            let key = app.key.trim();
            if key.is_empty() || seen.iter().any(|k: &String| k == key) {
                return false;
            }
            seen.push(key.to_string());
            true
        });
        for app in &mut self.external_apps {
            app.key = app.key.trim().to_string();
            app.program = app.program.trim().to_string();
            if app.title.trim().is_empty() {
                app.title = app.key.clone();
            }
        }
    }

    /// 查詢外部程式設定。 / Looks up an external application by key.
    pub fn external_app(&self, key: &str) -> Option<&ExternalApp> {
        self.external_apps.iter().find(|app| app.key == key)
    }

    /// Inserts or replaces the entry with the same key.
    pub fn set_external_app(&mut self, app: ExternalApp) {
        match self.external_apps.iter_mut().find(|a| a.key == app.key) {
            Some(existing) => *existing = app,
            None => self.external_apps.push(app),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookPreferences {
    #[serde(default = "default_true")]
    pub autosave_enabled: bool,
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
    /// Directory proposed for new notebooks.
    #[serde(default)]
    pub default_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_autosave_interval() -> u64 {
    10
}

impl Default for NotebookPreferences {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_interval_secs: default_autosave_interval(),
            default_dir: None,
        }
    }
}

impl NotebookPreferences {
    fn sanitize(&mut self) {
        if self.autosave_interval_secs == 0 {
            self.autosave_interval_secs = default_autosave_interval();
        }
        self.autosave_interval_secs = self
            .autosave_interval_secs
            .clamp(MIN_AUTOSAVE_SECS, MAX_AUTOSAVE_SECS);
        if self
            .default_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            self.default_dir = None;
        }
    }
}

/// 窗格排列方式。 / Arrangement of the list pane relative to the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// List above the editor.
    #[default]
    Vertical,
    /// List beside the editor.
    Horizontal,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Vertical => "vertical",
            ViewMode::Horizontal => "horizontal",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown view mode '{0}', expected vertical or horizontal")]
pub struct ViewModeParseError(String);

impl FromStr for ViewMode {
    type Err = ViewModeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(ViewMode::Vertical),
            "horizontal" => Ok(ViewMode::Horizontal),
            _ => Err(ViewModeParseError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub view_mode: ViewMode,
}

/// 外部程式設定。 / External program used to view or edit notebook content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalApp {
    pub key: String,
    #[serde(default)]
    pub title: String,
    /// Empty means the application has not been configured.
    #[serde(default)]
    pub program: String,
}

impl ExternalApp {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        program: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            program: program.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.program.trim().is_empty()
    }
}

fn default_external_apps() -> Vec<ExternalApp> {
    [
        ("file_explorer", "File Explorer"),
        ("web_browser", "Web Browser"),
        ("text_editor", "Text Editor"),
        ("image_editor", "Image Editor"),
        ("image_viewer", "Image Viewer"),
        ("screen_shot", "Screen Shot"),
    ]
    .into_iter()
    .map(|(key, title)| ExternalApp::new(key, title, ""))
    .collect()
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
