//! In-memory collaborators shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::node::NodeTree;
use crate::observer::Registry;
use crate::store::{Document, DocumentStore, NodeChange, StoreError};

pub const READABLE_VERSION: u32 = 2;

#[derive(Debug, Default)]
pub struct MemoryDisk {
    pub notebooks: HashMap<PathBuf, (u32, NodeTree)>,
    pub saves: usize,
}

/// Store keeping notebooks in a shared map; `fail_saves` makes every save fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub disk: Rc<RefCell<MemoryDisk>>,
    pub fail_saves: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, version: u32, tree: NodeTree) {
        self.disk
            .borrow_mut()
            .notebooks
            .insert(PathBuf::from(path), (version, tree));
    }

    pub fn saves(&self) -> usize {
        self.disk.borrow().saves
    }
}

pub struct MemoryDocument {
    path: PathBuf,
    tree: NodeTree,
    changes: Registry<NodeChange>,
    disk: Rc<RefCell<MemoryDisk>>,
    fail_saves: Rc<Cell<bool>>,
}

impl Document for MemoryDocument {
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
        if self.fail_saves.get() {
            return Err(StoreError::Io {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        let mut disk = self.disk.borrow_mut();
        disk.saves += 1;
        disk.notebooks
            .insert(self.path.clone(), (READABLE_VERSION, self.tree.clone()));
        Ok(())
    }

    fn changes(&mut self) -> &mut Registry<NodeChange> {
        &mut self.changes
    }
}

impl DocumentStore for MemoryStore {
    type Doc = MemoryDocument;

    fn create(&mut self, path: &Path) -> Result<MemoryDocument, StoreError> {
        if self.disk.borrow().notebooks.contains_key(path) {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "notebook exists"),
            });
        }
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Notebook".to_string());
        let tree = NodeTree::new(title, path);
        self.insert(&path.to_string_lossy(), READABLE_VERSION, tree.clone());
        Ok(self.document(path, tree))
    }

    fn load(&mut self, path: &Path) -> Result<MemoryDocument, StoreError> {
        let entry = self.disk.borrow().notebooks.get(path).cloned();
        match entry {
            Some((version, _)) if version > READABLE_VERSION => Err(StoreError::Version {
                found: version,
                readable: READABLE_VERSION,
            }),
            Some((_, tree)) => Ok(self.document(path, tree)),
            None => Err(StoreError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no notebook"),
            }),
        }
    }
}

impl MemoryStore {
    fn document(&self, path: &Path, tree: NodeTree) -> MemoryDocument {
        MemoryDocument {
            path: path.to_path_buf(),
            tree,
            changes: Registry::new(),
            disk: self.disk.clone(),
            fail_saves: self.fail_saves.clone(),
        }
    }
}
