//! 文件生命週期管理。 / Document Lifecycle Manager: open, modify, save,
//! close and autosave for the single active notebook.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use takenote_settings::Preferences;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::observer::SubscriptionId;
use crate::report::{report_error, Reporter};
use crate::store::{Document, DocumentStore, StoreError};
use crate::surface::EditorSurface;

/// Name shown in titles and messages.
pub const PROGRAM_NAME: &str = "TakeNote";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Closed,
    OpenClean,
    OpenModified,
}

impl LifecycleState {
    pub fn is_open(self) -> bool {
        self != LifecycleState::Closed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// 單次計時器排程。 / One-shot timers on the event loop. The host calls
/// [`LifecycleManager::autosave_tick`] when an armed timer fires.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId;

    fn cancel(&mut self, timer: TimerId);
}

/// Scheduler driven by hand; for headless front ends and tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next: u64,
    armed: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> &[(TimerId, Duration)] {
        &self.armed
    }

    pub fn cancelled(&self) -> &[TimerId] {
        &self.cancelled
    }

    /// Removes and returns the oldest armed timer, as if it had fired.
    pub fn fire_next(&mut self) -> Option<TimerId> {
        if self.armed.is_empty() {
            None
        } else {
            Some(self.armed.remove(0).0)
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next += 1;
        let id = TimerId(self.next);
        self.armed.push((id, delay));
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.armed.retain(|(id, _)| *id != timer);
        self.cancelled.push(timer);
    }
}

impl<S: Scheduler> Scheduler for Rc<RefCell<S>> {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.borrow_mut().schedule(delay)
    }

    fn cancel(&mut self, timer: TimerId) {
        self.borrow_mut().cancel(timer);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self::from(&Preferences::default())
    }
}

impl From<&Preferences> for AutosaveConfig {
    fn from(preferences: &Preferences) -> Self {
        Self {
            enabled: preferences.notebook.autosave_enabled,
            interval: Duration::from_secs(preferences.notebook.autosave_interval_secs),
        }
    }
}

/// The open notebook with its dirty flag and autosave timer.
pub struct DocumentSession<D> {
    document: D,
    dirty: Rc<Cell<bool>>,
    subscription: SubscriptionId,
    autosave: Option<TimerId>,
}

impl<D: Document> fmt::Debug for DocumentSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSession")
            .field("path", &self.document.path())
            .field("dirty", &self.dirty.get())
            .field("autosave", &self.autosave)
            .finish()
    }
}

/// 生命週期管理器。 / Owns the single document session.
pub struct LifecycleManager<S: DocumentStore> {
    store: S,
    scheduler: Box<dyn Scheduler>,
    config: AutosaveConfig,
    session: Option<DocumentSession<S::Doc>>,
}

impl<S: DocumentStore> fmt::Debug for LifecycleManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish()
    }
}

impl<S: DocumentStore> LifecycleManager<S> {
    pub fn new(store: S, scheduler: Box<dyn Scheduler>, config: AutosaveConfig) -> Self {
        Self {
            store,
            scheduler,
            config,
            session: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match &self.session {
            None => LifecycleState::Closed,
            Some(session) if session.dirty.get() => LifecycleState::OpenModified,
            Some(_) => LifecycleState::OpenClean,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn document(&self) -> Option<&S::Doc> {
        self.session.as_ref().map(|s| &s.document)
    }

    pub fn document_mut(&mut self) -> Option<&mut S::Doc> {
        self.session.as_mut().map(|s| &mut s.document)
    }

    pub fn path(&self) -> Option<&Path> {
        self.document().map(Document::path)
    }

    pub fn config(&self) -> AutosaveConfig {
        self.config
    }

    /// New settings apply at the next tick (disabling) or the next open (enabling).
    pub fn set_config(&mut self, config: AutosaveConfig) {
        self.config = config;
    }

    pub fn autosave_armed(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.autosave.is_some())
    }

    /// 建立新筆記本並開啟。 / Creates a notebook at `path` and opens it.
    pub fn create(
        &mut self,
        path: &Path,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        if self.is_open() {
            self.close(true, editor, reporter)?;
        }
        let created = self.store.create(path).and_then(|mut doc| doc.save());
        if let Err(err) = created {
            report_error(reporter, "Could not create new notebook", &err);
            return Err(err.into());
        }
        info!(path = %path.display(), "notebook created");
        self.open_inner(path, editor, reporter, "Created")
    }

    /// 開啟筆記本。 / Opens the notebook at `path`, closing (and saving) the
    /// current one first.
    pub fn open(
        &mut self,
        path: &Path,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        self.open_inner(path, editor, reporter, "Loaded")
    }

    fn open_inner(
        &mut self,
        path: &Path,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
        verb: &str,
    ) -> Result<()> {
        if self.is_open() {
            self.close(true, editor, reporter)?;
        }

        let mut document = match self.store.load(path) {
            Ok(document) => document,
            Err(err @ StoreError::Version { found, readable }) => {
                let message = format!(
                    "This version of {PROGRAM_NAME} cannot read this notebook.\n\
                     The notebook has version {found}.  {PROGRAM_NAME} can only read {readable}"
                );
                report_error(reporter, &message, &err);
                return Err(err.into());
            }
            Err(err) => {
                report_error(
                    reporter,
                    &format!("Could not load notebook '{}'", path.display()),
                    &err,
                );
                return Err(err.into());
            }
        };

        let dirty = Rc::new(Cell::new(false));
        let flag = dirty.clone();
        let subscription = document.changes().subscribe(move |change| {
            debug!(nodes = change.nodes.len(), "notebook changed");
            flag.set(true);
        });
        let autosave = self
            .config
            .enabled
            .then(|| self.scheduler.schedule(self.config.interval));

        let title = document.title().to_string();
        self.session = Some(DocumentSession {
            document,
            dirty,
            subscription,
            autosave,
        });
        info!(path = %path.display(), autosave = autosave.is_some(), "notebook opened");
        reporter.set_status(&format!("{verb} '{title}'"));
        Ok(())
    }

    /// 儲存。 / Flushes the editor and persists the notebook. A silent save
    /// clears the dirty flag even when it fails and reports only a status.
    pub fn save(
        &mut self,
        silent: bool,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(CoreError::Validation("no notebook is open".into()));
        };

        let outcome = editor
            .save()
            .map_err(CoreError::from)
            .and_then(|()| session.document.save().map_err(CoreError::from));

        match outcome {
            Ok(()) => {
                session.dirty.set(false);
                debug!(silent, "notebook saved");
                reporter.set_status("Notebook saved");
                Ok(())
            }
            Err(err) if silent => {
                session.dirty.set(false);
                warn!(error = %err, "autosave failed");
                reporter.set_status("Error saving notebook");
                Err(err)
            }
            Err(err) => {
                report_error(reporter, "Could not save notebook", &err);
                reporter.set_status("Error saving notebook");
                Err(err)
            }
        }
    }

    /// 關閉。 / Closes the notebook. A failed save does not prevent closing.
    pub fn close(
        &mut self,
        save: bool,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        if save {
            if let Err(err) = self.save(false, editor, reporter) {
                debug!(%err, "closing despite failed save");
            }
        }

        if let Some(mut session) = self.session.take() {
            session.document.changes().unsubscribe(session.subscription);
            if let Some(timer) = session.autosave.take() {
                self.scheduler.cancel(timer);
            }
            info!(path = %session.document.path().display(), "notebook closed");
        }
        if let Err(err) = editor.view_pages(&[]) {
            debug!(%err, "editor did not clear on close");
        }
        reporter.set_status("Notebook closed");
        Ok(())
    }

    /// Closes without saving and opens `path` again.
    pub fn reload(
        &mut self,
        path: &Path,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let path: PathBuf = path.to_path_buf();
        self.close(false, editor, reporter)?;
        self.open(&path, editor, reporter)?;
        reporter.set_status("Notebook reloaded");
        Ok(())
    }

    /// 自動儲存計時器觸發。 / Handles a fired autosave timer. Returns whether
    /// the timer was armed again.
    pub fn autosave_tick(
        &mut self,
        editor: &mut dyn EditorSurface,
        reporter: &mut dyn Reporter,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.autosave.take().is_none() {
            return false;
        }

        if let Err(err) = self.save(true, editor, reporter) {
            debug!(%err, "autosave tick kept going after failed save");
        }

        if !self.config.enabled {
            debug!("autosave disabled; timer not rearmed");
            return false;
        }
        let timer = self.scheduler.schedule(self.config.interval);
        match self.session.as_mut() {
            Some(session) => {
                session.autosave = Some(timer);
                true
            }
            None => {
                self.scheduler.cancel(timer);
                false
            }
        }
    }

    /// 標記已修改。 / Moves `OpenClean` to `OpenModified`. Returns whether the
    /// state changed.
    pub fn modification_notify(&mut self) -> bool {
        match &self.session {
            Some(session) if !session.dirty.get() => {
                session.dirty.set(true);
                true
            }
            _ => false,
        }
    }
}
