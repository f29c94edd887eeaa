//! 外部程式啟動。 / Opening notebook content in external applications.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use takenote_runexec::{LaunchSpec, Launcher, RunError};
use takenote_settings::{ExternalApp, Preferences};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no program is configured for '{0}'")]
    NotConfigured(String),
    #[error("could not start {title}: {source}")]
    Spawn {
        title: String,
        #[source]
        source: RunError,
    },
}

/// 外部程式啟動器。 / Runs the application registered under `app_key` on a file.
pub trait AppLauncher {
    fn run(&mut self, app_key: &str, filename: &Path) -> Result<(), LaunchError>;

    /// Human-readable name for `app_key`, used in messages.
    fn title(&self, app_key: &str) -> String {
        app_key.to_string()
    }
}

/// Launches applications listed in the `external_apps` preference.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    apps: Vec<ExternalApp>,
}

impl ProcessLauncher {
    pub fn new(apps: Vec<ExternalApp>) -> Self {
        Self { apps }
    }

    pub fn from_preferences(preferences: &Preferences) -> Self {
        Self::new(preferences.external_apps.clone())
    }

    fn configured(&self, app_key: &str) -> Result<&ExternalApp, LaunchError> {
        self.apps
            .iter()
            .find(|app| app.key == app_key && app.is_configured())
            .ok_or_else(|| LaunchError::NotConfigured(app_key.to_string()))
    }
}

impl AppLauncher for ProcessLauncher {
    fn run(&mut self, app_key: &str, filename: &Path) -> Result<(), LaunchError> {
        let app = self.configured(app_key)?;
        let spec = LaunchSpec::new(app.program.clone()).push_arg(filename.as_os_str());
        let launched = Launcher::spawn(&spec).map_err(|source| LaunchError::Spawn {
            title: app.title.clone(),
            source,
        })?;
        info!(app = app_key, pid = launched.pid, file = %filename.display(), "launched external app");
        Ok(())
    }

    fn title(&self, app_key: &str) -> String {
        self.apps
            .iter()
            .find(|app| app.key == app_key)
            .map(|app| app.title.clone())
            .unwrap_or_else(|| app_key.to_string())
    }
}

impl<L: AppLauncher> AppLauncher for Rc<RefCell<L>> {
    fn run(&mut self, app_key: &str, filename: &Path) -> Result<(), LaunchError> {
        self.borrow_mut().run(app_key, filename)
    }

    fn title(&self, app_key: &str) -> String {
        self.borrow().title(app_key)
    }
}
