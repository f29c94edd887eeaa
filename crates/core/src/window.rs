//! 主視窗協調器。 / Routes pane, control, timer and menu events of the note
//! window to the controllers that own the state.

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use takenote_settings::{Preferences, ViewMode};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::format::ColorTarget;
use crate::guard::Guard;
use crate::launcher::{AppLauncher, LaunchError};
use crate::lifecycle::{AutosaveConfig, LifecycleManager, LifecycleState, PROGRAM_NAME};
use crate::mirror::{ColorChoice, ControlId, ControlValue, FormatMirror};
use crate::navigation::{NavContext, NavigationController, Pane};
use crate::node::NodeId;
use crate::report::{report_error, Reporter};
use crate::store::{Document, DocumentStore, NodeChange};
use crate::surface::{EditorCommand, EditorSurface};

pub const NEW_FOLDER_TITLE: &str = "New Folder";
pub const NEW_PAGE_TITLE: &str = "New Page";
pub const IMAGE_VIEWER: &str = "image_viewer";
pub const IMAGE_EDITOR: &str = "image_editor";

/// 版面配置宿主。 / Widget host that tears down and rebuilds the split
/// between the list pane and the editor.
pub trait LayoutHost {
    fn rebuild(&mut self, mode: ViewMode);
}

impl<L: LayoutHost> LayoutHost for Rc<RefCell<L>> {
    fn rebuild(&mut self, mode: ViewMode) {
        self.borrow_mut().rebuild(mode);
    }
}

/// Layout host without widgets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLayout;

impl LayoutHost for NoLayout {
    fn rebuild(&mut self, _mode: ViewMode) {}
}

/// 筆記視窗。 / The note window: one notebook, three panes, one editor.
pub struct NoteWindow<S: DocumentStore, E: EditorSurface, R: Reporter> {
    lifecycle: LifecycleManager<S>,
    nav: NavigationController,
    mirror: FormatMirror,
    editor: E,
    reporter: R,
    launcher: Box<dyn AppLauncher>,
    layout: Box<dyn LayoutHost>,
    view_mode: ViewMode,
    view_mode_guard: Guard,
    node_changes: Rc<RefCell<Vec<NodeChange>>>,
    last_state: LifecycleState,
}

impl<S, E, R> fmt::Debug for NoteWindow<S, E, R>
where
    S: DocumentStore,
    E: EditorSurface,
    R: Reporter,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteWindow")
            .field("lifecycle", &self.lifecycle)
            .field("nav", &self.nav)
            .field("mirror", &self.mirror)
            .field("view_mode", &self.view_mode)
            .finish()
    }
}

impl<S, E, R> NoteWindow<S, E, R>
where
    S: DocumentStore,
    E: EditorSurface,
    R: Reporter,
{
    pub fn new(
        lifecycle: LifecycleManager<S>,
        editor: E,
        reporter: R,
        launcher: Box<dyn AppLauncher>,
        layout: Box<dyn LayoutHost>,
    ) -> Self {
        Self {
            lifecycle,
            nav: NavigationController::new(),
            mirror: FormatMirror::with_standard_controls(),
            editor,
            reporter,
            launcher,
            layout,
            view_mode: ViewMode::default(),
            view_mode_guard: Guard::new("view-mode"),
            node_changes: Rc::new(RefCell::new(Vec::new())),
            last_state: LifecycleState::Closed,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleManager<S> {
        &self.lifecycle
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.nav
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationController {
        &mut self.nav
    }

    pub fn mirror(&self) -> &FormatMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut FormatMirror {
        &mut self.mirror
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn document(&self) -> Option<&S::Doc> {
        self.lifecycle.document()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn view_mode_guard(&self) -> Guard {
        self.view_mode_guard.clone()
    }

    /// `TakeNote` when closed, `* <title>` when modified, `<title>` otherwise.
    pub fn window_title(&self) -> String {
        match (self.lifecycle.document(), self.lifecycle.state()) {
            (Some(doc), LifecycleState::OpenModified) => format!("* {}", doc.title()),
            (Some(doc), _) => doc.title().to_string(),
            (None, _) => PROGRAM_NAME.to_string(),
        }
    }

    /// Applies changed application options.
    pub fn apply_preferences(&mut self, preferences: &Preferences) {
        self.lifecycle
            .set_config(AutosaveConfig::from(preferences));
        if preferences.ui.view_mode != self.view_mode {
            self.set_view_mode(preferences.ui.view_mode);
        }
    }

    // Notebook lifecycle.

    pub fn new_notebook(&mut self, path: &Path) -> Result<()> {
        let result = self
            .lifecycle
            .create(path, &mut self.editor, &mut self.reporter);
        self.after_open();
        result
    }

    pub fn open_notebook(&mut self, path: &Path) -> Result<()> {
        let result = self
            .lifecycle
            .open(path, &mut self.editor, &mut self.reporter);
        self.after_open();
        result
    }

    pub fn save_notebook(&mut self) -> Result<()> {
        let result = self
            .lifecycle
            .save(false, &mut self.editor, &mut self.reporter);
        self.sync_state();
        result
    }

    pub fn close_notebook(&mut self) -> Result<()> {
        let result = self
            .lifecycle
            .close(true, &mut self.editor, &mut self.reporter);
        self.after_open();
        result
    }

    pub fn reload_notebook(&mut self) -> Result<()> {
        let Some(path) = self.lifecycle.path().map(Path::to_path_buf) else {
            let message = "Reloading only works when a notebook is open";
            self.reporter.show_error(message);
            return Err(CoreError::Validation(message.into()));
        };
        let result = self
            .lifecycle
            .reload(&path, &mut self.editor, &mut self.reporter);
        self.after_open();
        result
    }

    /// Timer callback; returns whether the timer was armed again.
    pub fn autosave_tick(&mut self) -> bool {
        let rearmed = self
            .lifecycle
            .autosave_tick(&mut self.editor, &mut self.reporter);
        self.sync_state();
        rearmed
    }

    // Pane events.

    pub fn select_in_tree(&mut self, nodes: &[NodeId]) -> Result<()> {
        self.with_nav(|nav, ctx| nav.select_in_tree(ctx, nodes))
    }

    pub fn select_in_list(&mut self, nodes: &[NodeId]) -> Result<()> {
        self.with_nav(|nav, ctx| nav.select_in_list(ctx, nodes))
    }

    /// "Go to note": selects `node`, or the first list selection, in the tree.
    pub fn goto_node(&mut self, node: Option<NodeId>) -> Result<()> {
        self.with_nav(|nav, ctx| nav.focus_node(ctx, node))
    }

    /// "Go to parent note".
    pub fn goto_parent(&mut self, node: Option<NodeId>) -> Result<()> {
        self.with_nav(|nav, ctx| nav.focus_parent_of(ctx, node))
    }

    /// 搜尋標題。 / Lists nodes whose titles contain every word of `query`.
    /// A blank query leaves search mode.
    pub fn search(&mut self, query: &str) -> Result<Vec<NodeId>> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            self.clear_search()?;
            return Ok(Vec::new());
        }
        self.with_nav(|nav, ctx| {
            let hits = ctx.tree.search_titles(&words);
            nav.show_search_results(ctx, &hits)?;
            Ok(hits)
        })
    }

    pub fn clear_search(&mut self) -> Result<()> {
        self.with_nav(|nav, ctx| nav.clear_search(ctx))
    }

    /// 新增資料夾。 / Creates a folder under the target resolved from `pane`.
    pub fn new_folder(&mut self, pane: Pane) -> Result<NodeId> {
        self.new_child(pane, NEW_FOLDER_TITLE, true)
    }

    pub fn new_page(&mut self, pane: Pane) -> Result<NodeId> {
        self.new_child(pane, NEW_PAGE_TITLE, false)
    }

    pub fn rename_node(&mut self, node: NodeId, title: &str) -> Result<()> {
        let document = self.lifecycle.document_mut().ok_or_else(no_notebook)?;
        document.set_title(node, title)?;
        self.after_event();
        Ok(())
    }

    fn new_child(&mut self, pane: Pane, title: &str, folder: bool) -> Result<NodeId> {
        let document = self.lifecycle.document_mut().ok_or_else(no_notebook)?;
        let parent = self.nav.create_parent(document.tree(), pane);
        let id = if folder {
            document.new_folder_child(parent, title)?
        } else {
            document.new_page_child(parent, title)?
        };
        debug!(%id, %parent, folder, "node created");
        self.after_event();
        Ok(id)
    }

    // Editor events.

    /// The caret moved or its formatting changed.
    pub fn editor_format_changed(&mut self) {
        let snapshot = self.editor.current_format();
        self.mirror.on_editor_format_changed(&snapshot);
    }

    pub fn editor_modified(&mut self, page: NodeId, modified: bool) {
        if modified {
            debug!(%page, "page modified");
            self.lifecycle.modification_notify();
        }
        self.sync_state();
    }

    pub fn control_changed(&mut self, id: ControlId, value: ControlValue) -> Result<()> {
        self.mirror.on_control_changed(id, value, &mut self.editor)
    }

    /// Routes control interactions queued by the bound controls' handlers.
    pub fn dispatch_control_changes(&mut self) -> Result<()> {
        for change in self.mirror.take_pending() {
            self.mirror
                .on_control_changed(change.id, change.value, &mut self.editor)?;
        }
        Ok(())
    }

    pub fn increase_font_size(&mut self) -> Result<()> {
        self.mirror.increase_font_size(&mut self.editor)
    }

    pub fn decrease_font_size(&mut self) -> Result<()> {
        self.mirror.decrease_font_size(&mut self.editor)
    }

    pub fn set_color(&mut self, target: ColorTarget, choice: ColorChoice) -> Result<()> {
        self.mirror.set_color(target, choice, &mut self.editor)
    }

    pub fn insert_rule(&mut self) -> Result<()> {
        self.page_command(EditorCommand::InsertRule)
    }

    pub fn indent(&mut self) -> Result<()> {
        self.page_command(EditorCommand::Indent)
    }

    pub fn unindent(&mut self) -> Result<()> {
        self.page_command(EditorCommand::Unindent)
    }

    /// 插入圖片。 / Inserts an image file; JPEG sources keep `.jpg`, anything
    /// else is stored as `.png`.
    pub fn insert_image(&mut self, source: &Path) -> Result<()> {
        if self.nav.active_page().is_none() {
            return Ok(());
        }
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let is_jpg = source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        let save_name = format!("{stem}.{}", if is_jpg { "jpg" } else { "png" });
        let command = EditorCommand::InsertImage {
            source: source.to_path_buf(),
            save_name,
        };
        if let Err(err) = self.editor.apply(command) {
            report_error(
                &mut self.reporter,
                &format!("Could not insert image '{}'", source.display()),
                &err,
            );
            return Err(err.into());
        }
        Ok(())
    }

    fn page_command(&mut self, command: EditorCommand) -> Result<()> {
        if self.nav.active_page().is_none() {
            return Ok(());
        }
        self.editor.apply(command)?;
        Ok(())
    }

    // External applications.

    /// 以外部程式開啟節點。 / Opens `node` (or the first node selected in
    /// `pane`) with `app`: the page content file when `page_only`, the node
    /// directory otherwise. Returns whether anything was launched.
    pub fn view_node_in_app(
        &mut self,
        app: &str,
        node: Option<NodeId>,
        pane: Pane,
        page_only: bool,
    ) -> Result<bool> {
        let document = self.lifecycle.document().ok_or_else(no_notebook)?;
        let tree = document.tree();
        let Some(node) = node.or_else(|| self.nav.selection(pane).first().copied()) else {
            self.reporter.show_error("No notes are selected.");
            return Ok(false);
        };

        let target = if page_only {
            tree.data_file_path(node)
        } else {
            tree.path(node)
        };
        let Some(target) = target else {
            if tree.contains(node) {
                let title = self.launcher.title(app);
                self.reporter
                    .show_error(&format!("Only pages can be viewed with {title}."));
                return Ok(false);
            }
            return Err(CoreError::Validation(format!(
                "node {node} is not part of the notebook"
            )));
        };

        self.launch(app, &absolute(&target))?;
        Ok(true)
    }

    /// Opens an image of the active page in the image viewer.
    pub fn view_image(&mut self, file_name: &str) -> Result<bool> {
        self.launch_page_file(IMAGE_VIEWER, file_name)
    }

    /// Opens an image of the active page in the image editor.
    pub fn edit_image(&mut self, file_name: &str) -> Result<bool> {
        self.launch_page_file(IMAGE_EDITOR, file_name)
    }

    fn launch_page_file(&mut self, app: &str, file_name: &str) -> Result<bool> {
        let Some(page) = self.nav.active_page() else {
            return Ok(false);
        };
        let page_dir = self
            .lifecycle
            .document()
            .and_then(|doc| doc.tree().path(page))
            .ok_or_else(no_notebook)?;
        self.launch(app, &page_dir.join(file_name))?;
        Ok(true)
    }

    fn launch(&mut self, app: &str, target: &Path) -> Result<()> {
        match self.launcher.run(app, target) {
            Ok(()) => Ok(()),
            Err(err) => {
                let title = self.launcher.title(app);
                let message = match &err {
                    LaunchError::NotConfigured(_) => {
                        format!("You must specify a program for {title} in Application Options")
                    }
                    LaunchError::Spawn { .. } => format!("Could not open {title}"),
                };
                report_error(&mut self.reporter, &message, &err);
                Err(err.into())
            }
        }
    }

    // Layout.

    /// 切換版面。 / Rebuilds the pane split for `mode`. A request arriving
    /// while a rebuild is in progress is ignored. Returns whether it applied.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if self.view_mode_guard.is_active() {
            debug!(%mode, "view mode change ignored during rebuild");
            return false;
        }
        let _scope = self.view_mode_guard.enter();
        self.layout.rebuild(mode);
        self.view_mode = mode;
        info!(%mode, "view mode set");
        true
    }

    fn with_nav<T>(
        &mut self,
        op: impl FnOnce(&mut NavigationController, &mut NavContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let document = self.lifecycle.document().ok_or_else(no_notebook)?;
        let mut ctx = NavContext {
            tree: document.tree(),
            editor: &mut self.editor,
            reporter: &mut self.reporter,
        };
        let result = op(&mut self.nav, &mut ctx);
        self.after_event();
        result
    }

    /// Refreshes the panes for queued document changes and the title state.
    fn after_event(&mut self) {
        let changes: Vec<NodeChange> = self.node_changes.borrow_mut().drain(..).collect();
        if let Some(document) = self.lifecycle.document() {
            let mut ctx = NavContext {
                tree: document.tree(),
                editor: &mut self.editor,
                reporter: &mut self.reporter,
            };
            for change in &changes {
                self.nav.on_nodes_changed(&mut ctx, change);
            }
        }
        self.sync_state();
    }

    fn after_open(&mut self) {
        self.nav.reset();
        self.node_changes.borrow_mut().clear();
        let queue = self.node_changes.clone();
        if let Some(document) = self.lifecycle.document_mut() {
            document
                .changes()
                .subscribe(move |change| queue.borrow_mut().push(change.clone()));
        }
        self.sync_state();
    }

    fn sync_state(&mut self) {
        let state = self.lifecycle.state();
        if state == LifecycleState::OpenModified && self.last_state != state {
            self.reporter.set_status("Notebook modified");
        }
        self.last_state = state;
    }
}

fn no_notebook() -> CoreError {
    CoreError::Validation("no notebook is open".into())
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Justify, Rgb};
    use crate::lifecycle::ManualScheduler;
    use crate::node::NodeTree;
    use crate::report::MessageLog;
    use crate::surface::HeadlessEditor;
    use crate::testing::MemoryStore;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLauncher {
        runs: Vec<(String, PathBuf)>,
        fail_with_missing: bool,
    }

    impl AppLauncher for RecordingLauncher {
        fn run(&mut self, app_key: &str, filename: &Path) -> std::result::Result<(), LaunchError> {
            if self.fail_with_missing {
                return Err(LaunchError::NotConfigured(app_key.to_string()));
            }
            self.runs.push((app_key.to_string(), filename.to_path_buf()));
            Ok(())
        }

        fn title(&self, app_key: &str) -> String {
            match app_key {
                "text_editor" => "Text Editor".to_string(),
                "image_viewer" => "Image Viewer".to_string(),
                other => other.to_string(),
            }
        }
    }

    struct GuardWatcher {
        guard: Option<Guard>,
        seen: Vec<(ViewMode, bool)>,
    }

    impl LayoutHost for GuardWatcher {
        fn rebuild(&mut self, mode: ViewMode) {
            let active = self.guard.as_ref().is_some_and(Guard::is_active);
            self.seen.push((mode, active));
        }
    }

    type TestWindow = NoteWindow<MemoryStore, HeadlessEditor, MessageLog>;

    struct Fixture {
        window: TestWindow,
        store: MemoryStore,
        launcher: Rc<RefCell<RecordingLauncher>>,
        layout: Rc<RefCell<GuardWatcher>>,
        folder: NodeId,
        page: NodeId,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mut tree = NodeTree::new("Journal", "/nb/journal");
        let root = tree.root_id();
        let folder = tree.new_folder_child(root, "Trips").unwrap();
        let page = tree.new_page_child(folder, "Lisbon").unwrap();
        store.insert("/nb/journal", 2, tree);

        let scheduler = Rc::new(RefCell::new(ManualScheduler::new()));
        let lifecycle = LifecycleManager::new(
            store.clone(),
            Box::new(scheduler),
            AutosaveConfig {
                enabled: true,
                interval: Duration::from_secs(10),
            },
        );
        let launcher = Rc::new(RefCell::new(RecordingLauncher::default()));
        let layout = Rc::new(RefCell::new(GuardWatcher {
            guard: None,
            seen: Vec::new(),
        }));
        let mut window = NoteWindow::new(
            lifecycle,
            HeadlessEditor::new(),
            MessageLog::new(),
            Box::new(launcher.clone()),
            Box::new(layout.clone()),
        );
        layout.borrow_mut().guard = Some(window.view_mode_guard());
        window.open_notebook(Path::new("/nb/journal")).unwrap();
        Fixture {
            window,
            store,
            launcher,
            layout,
            folder,
            page,
        }
    }

    #[test]
    fn title_tracks_lifecycle_state() {
        let mut fx = fixture();
        assert_eq!(fx.window.window_title(), "Journal");

        let page = fx.page;
        fx.window.editor_modified(page, true);
        assert_eq!(fx.window.window_title(), "* Journal");
        assert_eq!(fx.window.reporter().last_status(), Some("Notebook modified"));

        fx.window.save_notebook().unwrap();
        assert_eq!(fx.window.window_title(), "Journal");

        fx.window.close_notebook().unwrap();
        assert_eq!(fx.window.window_title(), "TakeNote");
    }

    #[test]
    fn new_page_goes_under_selected_page_parent_and_refreshes_list() {
        let mut fx = fixture();
        let (folder, page) = (fx.folder, fx.page);
        fx.window.select_in_tree(&[folder]).unwrap();
        assert_eq!(fx.window.navigation().selection(Pane::List), &[page]);

        let created = fx.window.new_page(Pane::List).unwrap();
        let tree = fx.window.document().unwrap().tree();
        assert_eq!(tree.parent(created), Some(folder));
        assert_eq!(tree.title(created), Some(NEW_PAGE_TITLE));
        assert!(fx.window.navigation().list_nodes().contains(&created));
        assert_eq!(fx.window.lifecycle().state(), LifecycleState::OpenModified);
    }

    #[test]
    fn new_folder_without_selection_goes_under_root() {
        let mut fx = fixture();
        let created = fx.window.new_folder(Pane::Tree).unwrap();
        let tree = fx.window.document().unwrap().tree();
        assert_eq!(tree.parent(created), Some(tree.root_id()));
        assert!(tree.is_folder(created));
    }

    #[test]
    fn search_lists_matches_and_blank_query_restores_listing() {
        let mut fx = fixture();
        let folder = fx.folder;
        fx.window.select_in_tree(&[folder]).unwrap();

        let hits = fx.window.search("  LIS ").unwrap();
        assert_eq!(hits, vec![fx.page]);
        assert!(fx.window.navigation().is_searching());

        fx.window.search("").unwrap();
        assert!(!fx.window.navigation().is_searching());
        assert_eq!(fx.window.navigation().list_nodes(), &[fx.page]);
    }

    #[test]
    fn blank_query_after_open_empties_search_listing() {
        let mut fx = fixture();
        assert!(fx.window.navigation().selection(Pane::Tree).is_empty());

        let hits = fx.window.search("lis").unwrap();
        assert_eq!(fx.window.navigation().list_nodes(), hits.as_slice());

        fx.window.search("").unwrap();
        assert!(!fx.window.navigation().is_searching());
        assert!(fx.window.navigation().list_nodes().is_empty());
    }

    #[test]
    fn view_node_requires_selection_and_page_for_page_only_apps() {
        let mut fx = fixture();
        assert!(!fx
            .window
            .view_node_in_app("text_editor", None, Pane::List, true)
            .unwrap());
        assert_eq!(fx.window.reporter().last_error(), Some("No notes are selected."));

        let folder = fx.folder;
        assert!(!fx
            .window
            .view_node_in_app("text_editor", Some(folder), Pane::Tree, true)
            .unwrap());
        assert_eq!(
            fx.window.reporter().last_error(),
            Some("Only pages can be viewed with Text Editor.")
        );
        assert!(fx.launcher.borrow().runs.is_empty());
    }

    #[test]
    fn view_node_launches_content_file_or_directory() {
        let mut fx = fixture();
        let (folder, page) = (fx.folder, fx.page);
        fx.window.select_in_tree(&[folder]).unwrap();

        assert!(fx
            .window
            .view_node_in_app("text_editor", None, Pane::List, true)
            .unwrap());
        assert!(fx
            .window
            .view_node_in_app("file_explorer", Some(folder), Pane::Tree, false)
            .unwrap());

        let launcher = fx.launcher.borrow();
        assert_eq!(launcher.runs[0].0, "text_editor");
        assert!(launcher.runs[0].1.ends_with("Trips/Lisbon/page.html"));
        assert_eq!(launcher.runs[1].0, "file_explorer");
        assert!(launcher.runs[1].1.ends_with("journal/Trips"));
        assert_eq!(fx.window.navigation().active_page(), Some(page));
    }

    #[test]
    fn launch_failure_is_reported() {
        let mut fx = fixture();
        fx.launcher.borrow_mut().fail_with_missing = true;
        let folder = fx.folder;
        fx.window.select_in_tree(&[folder]).unwrap();

        let err = fx.window.view_image("photo.png").unwrap_err();
        assert!(matches!(err, CoreError::Launch(LaunchError::NotConfigured(_))));
        assert_eq!(
            fx.window.reporter().last_error(),
            Some("You must specify a program for Image Viewer in Application Options")
        );
    }

    #[test]
    fn view_image_uses_active_page_directory() {
        let mut fx = fixture();
        assert!(!fx.window.view_image("photo.png").unwrap());

        let folder = fx.folder;
        fx.window.select_in_tree(&[folder]).unwrap();
        assert!(fx.window.view_image("photo.png").unwrap());
        let launcher = fx.launcher.borrow();
        assert_eq!(launcher.runs[0].0, IMAGE_VIEWER);
        assert_eq!(
            launcher.runs[0].1,
            PathBuf::from("/nb/journal/Trips/Lisbon/photo.png")
        );
    }

    #[test]
    fn page_commands_need_an_active_page() {
        let mut fx = fixture();
        fx.window.insert_rule().unwrap();
        fx.window.indent().unwrap();
        assert!(fx.window.editor().inserted().is_empty());
        assert_eq!(fx.window.editor().indent_level(), 0);

        let folder = fx.folder;
        fx.window.select_in_tree(&[folder]).unwrap();
        fx.window.insert_rule().unwrap();
        fx.window.indent().unwrap();
        fx.window.indent().unwrap();
        fx.window.unindent().unwrap();
        fx.window.insert_image(Path::new("/pics/Sunset.JPG")).unwrap();
        fx.window.insert_image(Path::new("/pics/diagram.gif")).unwrap();

        assert_eq!(fx.window.editor().indent_level(), 1);
        let inserted = fx.window.editor().inserted();
        assert_eq!(inserted[0], EditorCommand::InsertRule);
        assert!(matches!(&inserted[1], EditorCommand::InsertImage { save_name, .. } if save_name == "Sunset.jpg"));
        assert!(matches!(&inserted[2], EditorCommand::InsertImage { save_name, .. } if save_name == "diagram.png"));
    }

    #[test]
    fn view_mode_rebuild_runs_under_its_guard() {
        let mut fx = fixture();
        assert!(fx.window.set_view_mode(ViewMode::Horizontal));
        assert_eq!(fx.window.view_mode(), ViewMode::Horizontal);
        assert_eq!(fx.layout.borrow().seen, vec![(ViewMode::Horizontal, true)]);

        let guard = fx.window.view_mode_guard();
        let _rebuilding = guard.enter();
        assert!(!fx.window.set_view_mode(ViewMode::Vertical));
        assert_eq!(fx.window.view_mode(), ViewMode::Horizontal);
    }

    #[test]
    fn preferences_update_autosave_and_layout() {
        let mut fx = fixture();
        let mut prefs = Preferences::default();
        prefs.notebook.autosave_enabled = false;
        prefs.ui.view_mode = ViewMode::Horizontal;
        fx.window.apply_preferences(&prefs);
        assert!(!fx.window.lifecycle().config().enabled);
        assert_eq!(fx.window.view_mode(), ViewMode::Horizontal);
    }

    #[test]
    fn reload_requires_open_notebook() {
        let mut fx = fixture();
        fx.window.reload_notebook().unwrap();
        assert_eq!(fx.window.reporter().last_status(), Some("Notebook reloaded"));

        fx.window.close_notebook().unwrap();
        let err = fx.window.reload_notebook().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            fx.window.reporter().last_error(),
            Some("Reloading only works when a notebook is open")
        );
    }

    #[test]
    fn opening_resets_navigation() {
        let mut fx = fixture();
        let folder = fx.folder;
        fx.window.select_in_tree(&[folder]).unwrap();
        fx.window.open_notebook(Path::new("/nb/journal")).unwrap();
        assert!(fx.window.navigation().selection(Pane::Tree).is_empty());
        assert_eq!(fx.window.navigation().active_page(), None);
        assert!(fx.store.saves() >= 1);
    }

    #[test]
    fn control_changes_drive_editor_and_mirror() {
        let mut fx = fixture();
        fx.window
            .mirror_mut()
            .set_control(ControlId::JustifyFill, ControlValue::Toggle(true));
        fx.window.dispatch_control_changes().unwrap();
        assert_eq!(fx.window.editor().current_format().justify, Justify::Fill);
        assert_eq!(
            fx.window.mirror().read(ControlId::JustifyLeft),
            Some(ControlValue::Toggle(false))
        );

        fx.window
            .set_color(ColorTarget::Foreground, ColorChoice::Explicit(Rgb::new(9, 9, 9)))
            .unwrap();
        assert_eq!(
            fx.window.editor().current_format().fg_color,
            Some(Rgb::new(9, 9, 9))
        );

        fx.window.editor_mut().set_caret_format(Default::default());
        fx.window.editor_format_changed();
        assert!(fx.window.mirror().matches(&Default::default()));
        fx.window.increase_font_size().unwrap();
        fx.window.decrease_font_size().unwrap();
        fx.window
            .control_changed(ControlId::Bold, ControlValue::Toggle(true))
            .unwrap();
        assert!(fx.window.editor().current_format().bold);
    }

    #[test]
    fn rename_marks_document_modified() {
        let mut fx = fixture();
        let page = fx.page;
        fx.window.rename_node(page, "Porto").unwrap();
        assert_eq!(
            fx.window.document().unwrap().tree().title(page),
            Some("Porto")
        );
        assert_eq!(fx.window.window_title(), "* Journal");
    }

    #[test]
    fn autosave_tick_saves_open_notebook() {
        let mut fx = fixture();
        let before = fx.store.saves();
        assert!(fx.window.autosave_tick());
        assert_eq!(fx.store.saves(), before + 1);
    }
}
