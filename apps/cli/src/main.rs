use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use takenote_core::{
    AutosaveConfig, CoreError, Document, HeadlessEditor, LifecycleManager, ManualScheduler,
    NoLayout, NodeId, NodeTree, NoteWindow, Pane, ProcessLauncher, Reporter,
};
use takenote_notebook::FileStore;
use takenote_settings::{ExternalApp, Preferences, PreferencesStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "takenote",
    about = "Headless front end for TakeNote notebooks",
    author,
    version
)]
struct Cli {
    /// 偏好設定檔路徑。 / Preferences file (defaults to `.takenote/preferences.json`).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 顯示除錯訊息。 / Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 建立新筆記本。 / Create a notebook in a directory.
    New(NotebookArg),
    /// 列出筆記本結構。 / Print the folder and page hierarchy.
    Tree(NotebookArg),
    /// 新增頁面或資料夾。 / Add a page or folder.
    Add(AddArgs),
    /// 以標題搜尋。 / Search node titles.
    Search(SearchArgs),
    /// 以外部程式開啟節點。 / Open a node with an external application.
    OpenWith(OpenWithArgs),
    /// 管理偏好設定。 / Show or change preferences.
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Args)]
struct NotebookArg {
    /// Notebook directory; relative paths resolve against `notebook.default_dir`.
    #[arg(value_name = "DIR")]
    notebook: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NodeKindChoice {
    Page,
    Folder,
}

#[derive(Args)]
struct AddArgs {
    #[arg(value_name = "DIR")]
    notebook: PathBuf,
    #[arg(long, value_enum, default_value_t = NodeKindChoice::Page)]
    kind: NodeKindChoice,
    #[arg(long)]
    title: String,
    /// 上層節點；頁面會改用其所在資料夾。 / Parent node id; a page resolves to its folder.
    #[arg(long, value_name = "ID")]
    parent: Option<u64>,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(value_name = "DIR")]
    notebook: PathBuf,
    /// Every word must appear in the title (case-insensitive).
    #[arg(required = true, value_name = "WORD")]
    words: Vec<String>,
}

#[derive(Args)]
struct OpenWithArgs {
    #[arg(value_name = "DIR")]
    notebook: PathBuf,
    /// External application key, e.g. `text_editor`.
    #[arg(value_name = "APP")]
    app: String,
    #[arg(value_name = "NODE_ID")]
    node: u64,
    /// 只開啟頁面內容檔。 / Open the page content file instead of the node directory.
    #[arg(long)]
    page: bool,
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// 輸出目前設定。 / Print the current preferences as JSON.
    Show,
    /// 設定自動儲存。 / Change autosave settings.
    Autosave(AutosaveArgs),
    /// 設定外部程式。 / Set the program used for an external application.
    App(AppArgs),
}

#[derive(Args)]
struct AutosaveArgs {
    #[arg(long, value_name = "true|false")]
    enabled: Option<bool>,
    /// Interval in seconds (clamped to 1..=3600).
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
}

#[derive(Args)]
struct AppArgs {
    #[arg(value_name = "KEY")]
    key: String,
    /// Program to run; an empty string clears the entry.
    #[arg(value_name = "PROGRAM")]
    program: String,
    #[arg(long)]
    title: Option<String>,
}

type Window = NoteWindow<FileStore, HeadlessEditor, ConsoleReporter>;

/// Collects user-facing messages so failures can be shown once by `main`.
#[derive(Debug, Default)]
struct ConsoleReporter {
    errors: Vec<String>,
}

impl Reporter for ConsoleReporter {
    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn set_status(&mut self, message: &str) {
        info!(status = message);
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let config_path = match config {
        Some(path) => resolve_input_path(&path)?,
        None => default_config_path()?,
    };
    let mut prefs = PreferencesStore::load(&config_path)
        .with_context(|| format!("failed to load preferences from {}", config_path.display()))?;
    debug!(path = %config_path.display(), "preferences loaded");

    match command {
        Commands::New(args) => create_notebook(&args, prefs.preferences()),
        Commands::Tree(args) => print_tree(&args, prefs.preferences()),
        Commands::Add(args) => add_node(&args, prefs.preferences()),
        Commands::Search(args) => search_notebook(&args, prefs.preferences()),
        Commands::OpenWith(args) => open_with(&args, prefs.preferences()),
        Commands::Prefs(command) => execute_prefs_command(command, &mut prefs),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second initialisation only happens under test harnesses; keep the first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn create_notebook(args: &NotebookArg, preferences: &Preferences) -> Result<()> {
    let path = notebook_path(&args.notebook, preferences)?;
    let mut window = build_window(preferences);
    window
        .new_notebook(&path)
        .map_err(|err| user_error(&window, err))?;
    let title = window
        .document()
        .map(|doc| doc.title().to_string())
        .unwrap_or_default();
    window
        .close_notebook()
        .map_err(|err| user_error(&window, err))?;
    println!("Created notebook '{title}' at {}", path.display());
    Ok(())
}

fn print_tree(args: &NotebookArg, preferences: &Preferences) -> Result<()> {
    let window = open_window(&args.notebook, preferences)?;
    let tree = window
        .document()
        .map(|doc| doc.tree())
        .ok_or_else(|| anyhow!("no notebook is open"))?;
    for line in render_tree(tree) {
        println!("{line}");
    }
    Ok(())
}

fn add_node(args: &AddArgs, preferences: &Preferences) -> Result<()> {
    let mut window = open_window(&args.notebook, preferences)?;
    if let Some(parent) = args.parent {
        window
            .select_in_tree(&[NodeId::from_raw(parent)])
            .map_err(|err| user_error(&window, err))
            .with_context(|| format!("unknown parent node {parent}"))?;
    }

    let created = match args.kind {
        NodeKindChoice::Page => window.new_page(Pane::Tree),
        NodeKindChoice::Folder => window.new_folder(Pane::Tree),
    }
    .map_err(|err| user_error(&window, err))?;
    window
        .rename_node(created, &args.title)
        .map_err(|err| user_error(&window, err))?;
    window
        .save_notebook()
        .map_err(|err| user_error(&window, err))?;
    println!("{created}");
    Ok(())
}

fn search_notebook(args: &SearchArgs, preferences: &Preferences) -> Result<()> {
    let mut window = open_window(&args.notebook, preferences)?;
    let hits = window
        .search(&args.words.join(" "))
        .map_err(|err| user_error(&window, err))?;
    let tree = window
        .document()
        .map(|doc| doc.tree())
        .ok_or_else(|| anyhow!("no notebook is open"))?;
    if hits.is_empty() {
        println!("No matching notes");
    }
    for id in hits {
        println!("{id}\t{}", tree.title(id).unwrap_or_default());
    }
    Ok(())
}

fn open_with(args: &OpenWithArgs, preferences: &Preferences) -> Result<()> {
    let mut window = open_window(&args.notebook, preferences)?;
    let launched = window
        .view_node_in_app(
            &args.app,
            Some(NodeId::from_raw(args.node)),
            Pane::Tree,
            args.page,
        )
        .map_err(|err| user_error(&window, err))?;
    if !launched {
        return Err(user_error(
            &window,
            CoreError::Validation("nothing was opened".into()),
        ));
    }
    println!("Opened node {} with {}", args.node, args.app);
    Ok(())
}

fn execute_prefs_command(command: PrefsCommand, store: &mut PreferencesStore) -> Result<()> {
    match command {
        PrefsCommand::Show => {
            let rendered = serde_json::to_string_pretty(store.preferences())
                .context("failed to render preferences")?;
            println!("{rendered}");
            Ok(())
        }
        PrefsCommand::Autosave(args) => {
            if args.enabled.is_none() && args.interval.is_none() {
                bail!("nothing to change; pass --enabled and/or --interval");
            }
            store
                .update(|prefs| {
                    if let Some(enabled) = args.enabled {
                        prefs.notebook.autosave_enabled = enabled;
                    }
                    if let Some(interval) = args.interval {
                        prefs.notebook.autosave_interval_secs = interval;
                    }
                })
                .with_context(|| format!("failed to save {}", store.path().display()))?;
            let notebook = &store.preferences().notebook;
            println!(
                "Autosave {} every {}s",
                if notebook.autosave_enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                notebook.autosave_interval_secs
            );
            Ok(())
        }
        PrefsCommand::App(args) => {
            let title = args
                .title
                .clone()
                .or_else(|| {
                    store
                        .preferences()
                        .external_app(&args.key)
                        .map(|app| app.title.clone())
                })
                .unwrap_or_else(|| args.key.clone());
            store
                .update(|prefs| {
                    prefs.set_external_app(ExternalApp::new(
                        args.key.clone(),
                        title.clone(),
                        args.program.clone(),
                    ))
                })
                .with_context(|| format!("failed to save {}", store.path().display()))?;
            println!("{title} uses '{}'", args.program);
            Ok(())
        }
    }
}

fn build_window(preferences: &Preferences) -> Window {
    // One-shot commands never wait for the autosave timer.
    let lifecycle = LifecycleManager::new(
        FileStore::new(),
        Box::new(ManualScheduler::new()),
        AutosaveConfig::from(preferences),
    );
    let mut window = NoteWindow::new(
        lifecycle,
        HeadlessEditor::new(),
        ConsoleReporter::default(),
        Box::new(ProcessLauncher::from_preferences(preferences)),
        Box::new(NoLayout),
    );
    window.apply_preferences(preferences);
    window
}

fn open_window(notebook: &Path, preferences: &Preferences) -> Result<Window> {
    let path = notebook_path(notebook, preferences)?;
    let mut window = build_window(preferences);
    window
        .open_notebook(&path)
        .map_err(|err| user_error(&window, err))?;
    Ok(window)
}

/// Prefers the message shown to the user over the raw error.
fn user_error(window: &Window, err: CoreError) -> anyhow::Error {
    match window.reporter().errors.last() {
        Some(message) => anyhow!("{message}"),
        None => anyhow!(err),
    }
}

fn render_tree(tree: &NodeTree) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = vec![(tree.root_id(), 0)];
    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let marker = if node.is_folder() { "/" } else { "" };
        lines.push(format!(
            "{}{} {}{marker}",
            "  ".repeat(depth),
            id,
            node.title()
        ));
        stack.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
    }
    lines
}

fn notebook_path(path: &Path, preferences: &Preferences) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    match &preferences.notebook.default_dir {
        Some(dir) => resolve_input_path(&dir.join(path)),
        None => resolve_input_path(path),
    }
}

fn default_config_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()
        .context("determine current directory")?
        .join(".takenote")
        .join("preferences.json"))
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
