use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use takenote_core::{
    Document, DocumentStore, Node, NodeChange, NodeId, NodeTree, Registry, StoreError,
};
use tracing::{debug, info};

use crate::util::{touch, write_atomic};

/// File holding the notebook structure inside the notebook directory.
pub const NOTEBOOK_FILE: &str = "notebook.json";
/// Format version written by this build.
pub const NOTEBOOK_VERSION: u32 = 2;
/// Newest format version this build can read.
pub const READABLE_VERSION: u32 = 2;

/// 持久化格式。 / On-disk layout of `notebook.json`.
#[derive(Debug, Serialize, Deserialize)]
struct NotebookFile {
    version: u32,
    title: String,
    root: NodeId,
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

/// 以目錄儲存筆記本的儲存器。 / Stores each notebook as a directory with a
/// JSON structure file and one directory per node.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for FileStore {
    type Doc = FileNotebook;

    fn create(&mut self, path: &Path) -> Result<FileNotebook, StoreError> {
        let file = path.join(NOTEBOOK_FILE);
        if file.exists() {
            return Err(StoreError::Io {
                path: file,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "a notebook already exists"),
            });
        }
        fs::create_dir_all(path).map_err(|source| io_error(path, source))?;

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Notebook".to_string());
        let mut notebook = FileNotebook::new(path, NodeTree::new(title, path));
        notebook.save()?;
        info!(path = %path.display(), "created notebook");
        Ok(notebook)
    }

    fn load(&mut self, path: &Path) -> Result<FileNotebook, StoreError> {
        let file = path.join(NOTEBOOK_FILE);
        let contents = fs::read_to_string(&file).map_err(|source| io_error(&file, source))?;

        let header: VersionHeader =
            serde_json::from_str(&contents).map_err(|err| invalid(&file, err))?;
        let version = header
            .version
            .ok_or_else(|| invalid(&file, "missing format version"))?;
        if version > READABLE_VERSION {
            return Err(StoreError::Version {
                found: version,
                readable: READABLE_VERSION,
            });
        }

        let parsed: NotebookFile =
            serde_json::from_str(&contents).map_err(|err| invalid(&file, err))?;
        let tree = NodeTree::from_nodes(parsed.root, parsed.nodes, path)
            .map_err(|err| invalid(&file, err))?;
        debug!(path = %path.display(), version, nodes = tree.len(), "loaded notebook");
        Ok(FileNotebook::new(path, tree))
    }
}

/// 已開啟的筆記本。 / A notebook opened from disk.
pub struct FileNotebook {
    path: PathBuf,
    tree: NodeTree,
    changes: Registry<NodeChange>,
}

impl fmt::Debug for FileNotebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileNotebook")
            .field("path", &self.path)
            .field("nodes", &self.tree.len())
            .finish()
    }
}

impl FileNotebook {
    fn new(path: &Path, tree: NodeTree) -> Self {
        Self {
            path: path.to_path_buf(),
            tree,
            changes: Registry::new(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.path.join(NOTEBOOK_FILE)
    }

    /// Creates every node directory and an empty content file for new pages.
    fn materialize(&self) -> Result<(), StoreError> {
        for node in self.tree.nodes() {
            let id = node.id();
            let Some(dir) = self.tree.path(id) else {
                continue;
            };
            fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
            if let Some(data_file) = self.tree.data_file_path(id) {
                if touch(&data_file).map_err(|source| io_error(&data_file, source))? {
                    debug!(page = %id, "created page file");
                }
            }
        }
        Ok(())
    }
}

impl Document for FileNotebook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn title(&self) -> &str {
        self.tree.title(self.tree.root_id()).unwrap_or_default()
    }

    fn tree(&self) -> &NodeTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.materialize()?;
        let file = self.file_path();
        let payload = NotebookFile {
            version: NOTEBOOK_VERSION,
            title: self.title().to_string(),
            root: self.tree.root_id(),
            nodes: self.tree.nodes().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&payload).map_err(|err| invalid(&file, err))?;
        write_atomic(&file, &bytes).map_err(|source| io_error(&file, source))?;
        debug!(path = %self.path.display(), "saved notebook");
        Ok(())
    }

    fn changes(&mut self) -> &mut Registry<NodeChange> {
        &mut self.changes
    }
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn invalid(path: &Path, reason: impl fmt::Display) -> StoreError {
    StoreError::Invalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
