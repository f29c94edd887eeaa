//! Notebook hierarchy: folders and pages stored in an id-keyed arena.
//! 筆記本階層：以識別碼為鍵的資料夾與頁面集合。

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of a page's rich-text content inside its directory.
pub const PAGE_DATA_FILE: &str = "page.html";

/// Unique identifier of a node within one notebook.
/// 筆記本中每個節點的唯一識別碼。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of notebook node.
/// 節點的類型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Page {
        #[serde(default = "default_data_file")]
        data_file: String,
    },
}

fn default_data_file() -> String {
    PAGE_DATA_FILE.to_string()
}

impl NodeKind {
    pub fn page() -> Self {
        NodeKind::Page {
            data_file: default_data_file(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    pub fn is_page(&self) -> bool {
        matches!(self, NodeKind::Page { .. })
    }
}

/// One entry of the hierarchy. Children are owned by position in the
/// parent's list; `parent` is navigational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    title: String,
    dir_name: String,
    #[serde(default)]
    parent: Option<NodeId>,
    #[serde(default)]
    children: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    pub fn is_page(&self) -> bool {
        self.kind.is_page()
    }
}

/// Tree-manipulation errors.
/// 節點樹操作錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} cannot accept children")]
    InvalidParent(NodeId),
    #[error("node {0} appears more than once")]
    DuplicateNode(NodeId),
    #[error("node {child} does not agree with its parent {parent}")]
    BrokenLink { parent: NodeId, child: NodeId },
    #[error("node {0} is not reachable from the root")]
    Unreachable(NodeId),
    #[error("node {node} has an unusable directory name '{name}'")]
    InvalidDirName { node: NodeId, name: String },
    #[error("folder {parent} holds more than one '{name}' directory")]
    DuplicateDirName { parent: NodeId, name: String },
    #[error("page {node} has an unusable content file name '{name}'")]
    InvalidDataFile { node: NodeId, name: String },
}

/// Notebook hierarchy with a single folder root.
/// 以單一資料夾為根的筆記本階層。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTree {
    root: NodeId,
    next_id: u64,
    base_path: PathBuf,
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeTree {
    /// 建立僅含根資料夾的樹。 / Creates a tree holding only the root folder.
    pub fn new(root_title: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        let root_id = NodeId(1);
        let root = Node {
            id: root_id,
            kind: NodeKind::Folder,
            title: root_title.into(),
            dir_name: String::new(),
            parent: None,
            children: Vec::new(),
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            next_id: 2,
            base_path: base_path.into(),
            nodes,
        }
    }

    /// 由持久化的節點清單重建樹並驗證結構。 / Rebuilds a tree from persisted
    /// nodes, checking that every link is consistent and every node reachable.
    pub fn from_nodes(
        root: NodeId,
        nodes: Vec<Node>,
        base_path: impl Into<PathBuf>,
    ) -> Result<Self, TreeError> {
        let mut map = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if map.insert(id, node).is_some() {
                return Err(TreeError::DuplicateNode(id));
            }
        }

        let root_node = map.get(&root).ok_or(TreeError::NodeNotFound(root))?;
        if !root_node.is_folder() {
            return Err(TreeError::InvalidParent(root));
        }
        if let Some(parent) = root_node.parent {
            return Err(TreeError::BrokenLink { parent, child: root });
        }

        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(TreeError::DuplicateNode(id));
            }
            let node = map.get(&id).ok_or(TreeError::NodeNotFound(id))?;
            if !node.children.is_empty() && !node.is_folder() {
                return Err(TreeError::InvalidParent(id));
            }
            let dir_ok = if id == root {
                node.dir_name.is_empty()
            } else {
                is_plain_name(&node.dir_name)
            };
            if !dir_ok {
                return Err(TreeError::InvalidDirName {
                    node: id,
                    name: node.dir_name.clone(),
                });
            }
            if let NodeKind::Page { data_file } = &node.kind {
                if !is_plain_name(data_file) {
                    return Err(TreeError::InvalidDataFile {
                        node: id,
                        name: data_file.clone(),
                    });
                }
            }
            let mut dir_names = HashSet::new();
            let mut distinct = HashSet::new();
            for child in node.children.iter().filter(|child| distinct.insert(**child)) {
                if let Some(child_node) = map.get(child) {
                    if !dir_names.insert(child_node.dir_name.as_str()) {
                        return Err(TreeError::DuplicateDirName {
                            parent: id,
                            name: child_node.dir_name.clone(),
                        });
                    }
                }
            }
            for child in &node.children {
                let child_node = map.get(child).ok_or(TreeError::NodeNotFound(*child))?;
                if child_node.parent != Some(id) {
                    return Err(TreeError::BrokenLink {
                        parent: id,
                        child: *child,
                    });
                }
                stack.push(*child);
            }
        }
        if let Some(orphan) = map.keys().find(|id| !visited.contains(id)) {
            return Err(TreeError::Unreachable(*orphan));
        }

        let next_id = map.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        Ok(Self {
            root,
            next_id,
            base_path: base_path.into(),
            nodes: map,
        })
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn set_base_path(&mut self, path: impl Into<PathBuf>) {
        self.base_path = path.into();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in id order, as persisted by the notebook store.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn title(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(Node::title)
    }

    pub fn is_page(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_page)
    }

    pub fn is_folder(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_folder)
    }

    /// 由近到遠列出祖先節點。 / Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    pub fn new_folder_child(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.add_child(parent, title.into(), NodeKind::Folder)
    }

    pub fn new_page_child(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.add_child(parent, title.into(), NodeKind::page())
    }

    /// Renames a node; its directory name is kept so content stays in place.
    pub fn set_title(&mut self, id: NodeId, title: impl Into<String>) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        node.title = title.into();
        Ok(())
    }

    /// 節點在磁碟上的資料夾。 / Directory of the node inside the notebook.
    pub fn path(&self, id: NodeId) -> Option<PathBuf> {
        let node = self.get(id)?;
        let mut segments = vec![node.dir_name.as_str()];
        for ancestor in self.ancestors(id) {
            segments.push(self.get(ancestor)?.dir_name.as_str());
        }
        let mut path = self.base_path.clone();
        for segment in segments.into_iter().rev().filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        Some(path)
    }

    /// Content file of a page; `None` for folders.
    pub fn data_file_path(&self, id: NodeId) -> Option<PathBuf> {
        match self.get(id)?.kind() {
            NodeKind::Page { data_file } => Some(self.path(id)?.join(data_file)),
            NodeKind::Folder => None,
        }
    }

    /// 以標題搜尋節點。 / Pre-order search for nodes whose title contains
    /// every word (case-insensitive). The root is never returned.
    pub fn search_titles(&self, words: &[String]) -> Vec<NodeId> {
        let words: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(self.root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            let title = node.title.to_lowercase();
            if words.iter().all(|word| title.contains(word.as_str())) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    fn add_child(
        &mut self,
        parent_id: NodeId,
        title: String,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        let parent = self
            .nodes
            .get(&parent_id)
            .ok_or(TreeError::NodeNotFound(parent_id))?;
        if !parent.is_folder() {
            return Err(TreeError::InvalidParent(parent_id));
        }

        let taken: HashSet<&str> = parent
            .children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .map(|child| child.dir_name.as_str())
            .collect();
        let dir_name = unique_dir_name(&title, &taken);

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                kind,
                title,
                dir_name,
                parent: Some(parent_id),
                children: Vec::new(),
            },
        );
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(id);
        }
        Ok(id)
    }
}

/// A single path segment that stays inside its parent directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', ':', '\0'])
}

fn unique_dir_name(title: &str, taken: &HashSet<&str>) -> String {
    let mut slug = String::new();
    for ch in title.trim().chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            slug.push(ch);
        } else if (ch.is_whitespace() || ch == '.') && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    let base = if slug.is_empty() { "node" } else { slug };

    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (NodeTree, NodeId, NodeId, NodeId) {
        let mut tree = NodeTree::new("Notes", "/notebooks/notes");
        let root = tree.root_id();
        let work = tree.new_folder_child(root, "Work").unwrap();
        let plan = tree.new_page_child(work, "Weekly plan").unwrap();
        (tree, work, plan, root)
    }

    #[test]
    fn children_are_linked_to_parent() {
        let (tree, work, plan, root) = sample();
        assert_eq!(tree.children(root), &[work]);
        assert_eq!(tree.parent(plan), Some(work));
        assert_eq!(tree.ancestors(plan), vec![work, root]);
        assert!(tree.is_page(plan));
        assert!(tree.is_folder(work));
    }

    #[test]
    fn page_cannot_accept_children() {
        let (mut tree, _, plan, _) = sample();
        let err = tree.new_page_child(plan, "nested").unwrap_err();
        assert_eq!(err, TreeError::InvalidParent(plan));
        let missing = NodeId::from_raw(99);
        assert_eq!(
            tree.new_folder_child(missing, "x").unwrap_err(),
            TreeError::NodeNotFound(missing)
        );
    }

    #[test]
    fn paths_follow_directory_names() {
        let (tree, work, plan, root) = sample();
        assert_eq!(tree.path(root).unwrap(), PathBuf::from("/notebooks/notes"));
        assert_eq!(
            tree.path(work).unwrap(),
            PathBuf::from("/notebooks/notes/Work")
        );
        assert_eq!(
            tree.data_file_path(plan).unwrap(),
            PathBuf::from("/notebooks/notes/Work/Weekly_plan/page.html")
        );
        assert!(tree.data_file_path(work).is_none());
    }

    #[test]
    fn sibling_directory_names_are_unique() {
        let mut tree = NodeTree::new("Notes", "/tmp/n");
        let root = tree.root_id();
        let first = tree.new_page_child(root, "Ideas").unwrap();
        let second = tree.new_page_child(root, "Ideas").unwrap();
        let blank = tree.new_page_child(root, "  ").unwrap();
        assert_eq!(tree.get(first).unwrap().dir_name(), "Ideas");
        assert_eq!(tree.get(second).unwrap().dir_name(), "Ideas-2");
        assert_eq!(tree.get(blank).unwrap().dir_name(), "node");
    }

    #[test]
    fn search_matches_all_words_case_insensitively() {
        let (mut tree, work, plan, _) = sample();
        let other = tree.new_page_child(work, "Plan B").unwrap();
        let hits = tree.search_titles(&["PLAN".to_string()]);
        assert_eq!(hits, vec![plan, other]);
        let hits = tree.search_titles(&["weekly".to_string(), "plan".to_string()]);
        assert_eq!(hits, vec![plan]);
    }

    #[test]
    fn from_nodes_rebuilds_and_continues_ids() {
        let (tree, _, _, root) = sample();
        let nodes: Vec<Node> = tree.nodes().cloned().collect();
        let mut rebuilt = NodeTree::from_nodes(root, nodes, "/elsewhere").unwrap();
        assert_eq!(rebuilt.len(), 3);
        let fresh = rebuilt.new_page_child(root, "Later").unwrap();
        assert_eq!(fresh.as_u64(), 4);
    }

    #[test]
    fn from_nodes_rejects_orphans_and_broken_links() {
        let (mut tree, work, _, root) = sample();
        let mut nodes: Vec<Node> = tree.nodes().cloned().collect();
        nodes.retain(|node| node.id() != work);
        assert!(matches!(
            NodeTree::from_nodes(root, nodes, "/x"),
            Err(TreeError::NodeNotFound(_))
        ));

        let stray = tree.new_page_child(root, "stray").unwrap();
        let mut nodes: Vec<Node> = tree.nodes().cloned().collect();
        for node in nodes.iter_mut().filter(|n| n.id() == root) {
            node.children.retain(|child| *child != stray);
        }
        assert_eq!(
            NodeTree::from_nodes(root, nodes, "/x").unwrap_err(),
            TreeError::Unreachable(stray)
        );
    }
    #[test]
    fn from_nodes_rejects_names_leaving_the_notebook() {
        let (tree, work, plan, root) = sample();
        let rebuild = |edit: &dyn Fn(&mut Node)| {
            let mut nodes: Vec<Node> = tree.nodes().cloned().collect();
            nodes.iter_mut().for_each(|node| edit(node));
            NodeTree::from_nodes(root, nodes, "/x")
        };

        for bad in ["", "..", "../escaped", "a/b", "a\\b", "C:"] {
            let err = rebuild(&|node: &mut Node| {
                if node.id == work {
                    node.dir_name = bad.to_string();
                }
            })
            .unwrap_err();
            assert!(matches!(err, TreeError::InvalidDirName { node, .. } if node == work));
        }

        let err = rebuild(&|node: &mut Node| {
            if node.id == plan {
                node.kind = NodeKind::Page {
                    data_file: "../../outside.html".into(),
                };
            }
        })
        .unwrap_err();
        assert!(matches!(err, TreeError::InvalidDataFile { node, .. } if node == plan));

        let err = rebuild(&|node: &mut Node| {
            if node.id == root {
                node.dir_name = "nested".into();
            }
        })
        .unwrap_err();
        assert!(matches!(err, TreeError::InvalidDirName { node, .. } if node == root));
    }

    #[test]
    fn from_nodes_rejects_sibling_directory_clash() {
        let (mut tree, work, _, root) = sample();
        let other = tree.new_folder_child(root, "Home").unwrap();
        let mut nodes: Vec<Node> = tree.nodes().cloned().collect();
        for node in nodes.iter_mut().filter(|n| n.id == other) {
            node.dir_name = tree.get(work).unwrap().dir_name().to_string();
        }
        assert!(matches!(
            NodeTree::from_nodes(root, nodes, "/x").unwrap_err(),
            TreeError::DuplicateDirName { parent, .. } if parent == root
        ));
    }
}
