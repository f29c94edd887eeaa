//! 文件儲存的協作介面。 / Boundary to the on-disk notebook store.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::node::{NodeId, NodeTree, TreeError};
use crate::observer::Registry;

/// Change notification emitted by a document: the affected nodes and whether
/// their descendants changed too.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeChange {
    pub nodes: Vec<NodeId>,
    pub recursive: bool,
}

/// 儲存層錯誤。 / Failures of the notebook store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("notebook has format version {found}, but only up to {readable} can be read")]
    Version { found: u32, readable: u32 },
    #[error("notebook I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid notebook {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// 已開啟的筆記本。 / An opened notebook document.
pub trait Document {
    fn path(&self) -> &Path;

    fn title(&self) -> &str;

    fn tree(&self) -> &NodeTree;

    fn tree_mut(&mut self) -> &mut NodeTree;

    fn save(&mut self) -> Result<(), StoreError>;

    /// Stream of `(affected nodes, recursive)` change notifications.
    fn changes(&mut self) -> &mut Registry<NodeChange>;

    fn new_folder_child(&mut self, parent: NodeId, title: &str) -> Result<NodeId, TreeError> {
        let id = self.tree_mut().new_folder_child(parent, title)?;
        self.changes().emit(&NodeChange {
            nodes: vec![parent],
            recursive: false,
        });
        Ok(id)
    }

    fn new_page_child(&mut self, parent: NodeId, title: &str) -> Result<NodeId, TreeError> {
        let id = self.tree_mut().new_page_child(parent, title)?;
        self.changes().emit(&NodeChange {
            nodes: vec![parent],
            recursive: false,
        });
        Ok(id)
    }

    fn set_title(&mut self, node: NodeId, title: &str) -> Result<(), TreeError> {
        self.tree_mut().set_title(node, title)?;
        self.changes().emit(&NodeChange {
            nodes: vec![node],
            recursive: false,
        });
        Ok(())
    }
}

/// 建立與載入筆記本的儲存器。 / Creates and loads notebooks.
pub trait DocumentStore {
    type Doc: Document;

    fn create(&mut self, path: &Path) -> Result<Self::Doc, StoreError>;

    fn load(&mut self, path: &Path) -> Result<Self::Doc, StoreError>;
}
