//! 應用程式偏好設定。 / Application preferences for TakeNote.

pub mod preferences;

pub use preferences::{
    ExternalApp, NotebookPreferences, Preferences, PreferencesError, PreferencesStore,
    UiPreferences, ViewMode, ViewModeParseError,
};
