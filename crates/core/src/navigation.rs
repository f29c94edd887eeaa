//! 導覽控制器。 / Navigation Controller: keeps the tree pane, the list pane
//! and the editor consistent under selection events.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::guard::Guard;
use crate::node::{NodeId, NodeTree};
use crate::observer::Registry;
use crate::report::{report_error, Reporter};
use crate::store::NodeChange;
use crate::surface::{EditorSurface, PageRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pane {
    Tree,
    List,
}

/// 窗格更新事件。 / Model changes widget adapters mirror into their panes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaneUpdate {
    TreeSelected(Vec<NodeId>),
    ListPopulated(Vec<NodeId>),
    ListSelected(Vec<NodeId>),
    ActivePage(Option<NodeId>),
}

/// One-slot buffer of a list selection to restore after the next list
/// repopulation. Pushing overwrites.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingSelection {
    slot: Option<Vec<NodeId>>,
}

impl PendingSelection {
    pub fn push(&mut self, nodes: Vec<NodeId>) {
        self.slot = Some(nodes);
    }

    pub fn take(&mut self) -> Option<Vec<NodeId>> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&[NodeId]> {
        self.slot.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// What the list pane is currently showing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListSource {
    /// Children of the selected tree folders.
    Children,
    /// An externally supplied result set.
    Search(Vec<NodeId>),
}

/// Collaborators a navigation operation needs.
pub struct NavContext<'a> {
    pub tree: &'a NodeTree,
    pub editor: &'a mut dyn EditorSurface,
    pub reporter: &'a mut dyn Reporter,
}

/// 決定新節點的父節點。 / Parent for a node created from `selection`: the
/// parent of a single selected page, a single selected folder itself, or the
/// root otherwise.
pub fn resolve_create_parent(tree: &NodeTree, selection: &[NodeId]) -> NodeId {
    match selection {
        [only] if tree.is_page(*only) => tree.parent(*only).unwrap_or_else(|| tree.root_id()),
        [only] if tree.is_folder(*only) => *only,
        _ => tree.root_id(),
    }
}

#[derive(Debug)]
pub struct NavigationController {
    tree_selection: Vec<NodeId>,
    list_nodes: Vec<NodeId>,
    list_selection: Vec<NodeId>,
    active_page: Option<NodeId>,
    pending: PendingSelection,
    /// Queued nodes that were hidden below a listed folder, replayed when
    /// that folder becomes the tree selection.
    restore: Option<(NodeId, Vec<NodeId>)>,
    source: ListSource,
    repopulations: usize,
    updates: Registry<PaneUpdate>,
    focus_guard: Guard,
    list_guard: Guard,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    pub fn new() -> Self {
        Self {
            tree_selection: Vec::new(),
            list_nodes: Vec::new(),
            list_selection: Vec::new(),
            active_page: None,
            pending: PendingSelection::default(),
            restore: None,
            source: ListSource::Children,
            repopulations: 0,
            updates: Registry::new(),
            focus_guard: Guard::new("focus-node"),
            list_guard: Guard::new("list-select"),
        }
    }

    pub fn selection(&self, pane: Pane) -> &[NodeId] {
        match pane {
            Pane::Tree => &self.tree_selection,
            Pane::List => &self.list_selection,
        }
    }

    pub fn list_nodes(&self) -> &[NodeId] {
        &self.list_nodes
    }

    pub fn active_page(&self) -> Option<NodeId> {
        self.active_page
    }

    pub fn pending(&self) -> &PendingSelection {
        &self.pending
    }

    pub fn source(&self) -> &ListSource {
        &self.source
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.source, ListSource::Search(_))
    }

    /// Number of times the list pane has been rebuilt.
    pub fn repopulation_count(&self) -> usize {
        self.repopulations
    }

    pub fn updates(&mut self) -> &mut Registry<PaneUpdate> {
        &mut self.updates
    }

    /// Active while a focus request drives the tree pane.
    pub fn focus_guard(&self) -> Guard {
        self.focus_guard.clone()
    }

    /// Active while the controller itself sets the list selection.
    pub fn list_guard(&self) -> Guard {
        self.list_guard.clone()
    }

    /// 樹狀窗格選取。 / Handles a tree-pane selection. Reselecting the current
    /// set (in any order) does nothing.
    pub fn select_in_tree(&mut self, ctx: &mut NavContext<'_>, nodes: &[NodeId]) -> Result<()> {
        ensure_known(ctx.tree, nodes)?;
        if !self.is_searching() && same_set(&self.tree_selection, nodes) {
            debug!(?nodes, "tree selection unchanged");
            return Ok(());
        }

        self.tree_selection = dedup(nodes);
        self.updates
            .emit(&PaneUpdate::TreeSelected(self.tree_selection.clone()));
        self.source = ListSource::Children;
        let listed = children_of_folders(ctx.tree, &self.tree_selection);
        self.populate_list(listed);

        let restore = self.restore.take();
        let queued = self.pending.take().or_else(|| match restore {
            Some((anchor, nodes)) if self.tree_selection == [anchor] => Some(nodes),
            _ => None,
        });
        let selection = match queued {
            Some(queued) => {
                let (resolved, hidden) = self.resolve_displayed(ctx.tree, &queued);
                self.restore = hidden;
                if resolved.is_empty() {
                    self.displayed_pages(ctx.tree)
                } else {
                    resolved
                }
            }
            None => self.displayed_pages(ctx.tree),
        };
        self.apply_list_selection(ctx, selection);
        Ok(())
    }

    /// 清單窗格選取。 / Handles a list-pane selection: the first page becomes
    /// the active page and is loaded into the editor.
    pub fn select_in_list(&mut self, ctx: &mut NavContext<'_>, nodes: &[NodeId]) -> Result<()> {
        ensure_known(ctx.tree, nodes)?;
        let shown: Vec<NodeId> = dedup(nodes)
            .into_iter()
            .filter(|id| self.list_nodes.contains(id))
            .collect();
        if shown.len() != nodes.len() {
            debug!(
                requested = nodes.len(),
                shown = shown.len(),
                "ignoring nodes not displayed in the list"
            );
        }

        self.list_selection = shown;
        self.updates
            .emit(&PaneUpdate::ListSelected(self.list_selection.clone()));

        let page = self
            .list_selection
            .iter()
            .copied()
            .find(|id| ctx.tree.is_page(*id));
        self.active_page = page;
        self.updates.emit(&PaneUpdate::ActivePage(page));

        let pages: Vec<PageRef> = page
            .and_then(|id| PageRef::resolve(ctx.tree, id))
            .into_iter()
            .collect();
        if let Err(err) = ctx.editor.view_pages(&pages) {
            let title = pages.first().map(|p| p.title.as_str()).unwrap_or_default();
            report_error(
                ctx.reporter,
                &format!("Could not load page '{title}'"),
                &err,
            );
        }
        Ok(())
    }

    /// 聚焦節點。 / Selects `node` (or the first list selection) in the tree.
    pub fn focus_node(&mut self, ctx: &mut NavContext<'_>, node: Option<NodeId>) -> Result<()> {
        let Some(node) = node.or_else(|| self.list_selection.first().copied()) else {
            return Ok(());
        };
        if !ctx.tree.contains(node) {
            return Ok(());
        }
        let _scope = self.focus_guard.enter();
        self.select_in_tree(ctx, &[node])
    }

    /// 聚焦父節點。 / Ascends to the parent of `node`, the single tree
    /// selection, or the first list selection, queueing the current list
    /// selection for restoration.
    pub fn focus_parent_of(
        &mut self,
        ctx: &mut NavContext<'_>,
        node: Option<NodeId>,
    ) -> Result<()> {
        let node = node
            .or_else(|| match self.tree_selection.as_slice() {
                [only] => Some(*only),
                _ => None,
            })
            .or_else(|| self.list_selection.first().copied());
        let Some(node) = node else {
            return Ok(());
        };
        let Some(parent) = ctx.tree.parent(node) else {
            return Ok(());
        };

        let queued = if self.list_selection.is_empty() {
            vec![node]
        } else {
            self.list_selection.clone()
        };
        self.pending.push(queued);

        let _scope = self.focus_guard.enter();
        self.select_in_tree(ctx, &[parent])
    }

    /// Parent for a node created from `pane`'s selection.
    pub fn create_parent(&self, tree: &NodeTree, pane: Pane) -> NodeId {
        resolve_create_parent(tree, self.selection(pane))
    }

    /// 顯示搜尋結果。 / Shows an externally supplied result set in the list.
    pub fn show_search_results(
        &mut self,
        ctx: &mut NavContext<'_>,
        results: &[NodeId],
    ) -> Result<()> {
        ensure_known(ctx.tree, results)?;
        let results = dedup(results);
        self.source = ListSource::Search(results.clone());
        self.pending.clear();
        self.restore = None;
        self.populate_list(results);
        self.apply_list_selection(ctx, Vec::new());
        Ok(())
    }

    /// Leaves search mode and lists the tree selection's children again.
    pub fn clear_search(&mut self, ctx: &mut NavContext<'_>) -> Result<()> {
        if !self.is_searching() {
            return Ok(());
        }
        self.source = ListSource::Children;
        let listed = children_of_folders(ctx.tree, &self.tree_selection);
        self.populate_list(listed);
        let selection = self.displayed_pages(ctx.tree);
        self.apply_list_selection(ctx, selection);
        Ok(())
    }

    /// 節點變更時更新清單。 / Refreshes the listing after a document change
    /// touching listed nodes or their parents, keeping the selection.
    pub fn on_nodes_changed(&mut self, ctx: &mut NavContext<'_>, change: &NodeChange) {
        self.tree_selection.retain(|id| ctx.tree.contains(*id));
        if self.is_searching() {
            return;
        }
        let touched = change.nodes.iter().any(|id| {
            self.tree_selection.contains(id) || self.list_nodes.contains(id)
        });
        if !touched {
            return;
        }

        let listed = children_of_folders(ctx.tree, &self.tree_selection);
        self.populate_list(listed);
        let kept: Vec<NodeId> = self
            .list_selection
            .iter()
            .copied()
            .filter(|id| self.list_nodes.contains(id))
            .collect();
        if kept != self.list_selection {
            self.apply_list_selection(ctx, kept);
        } else {
            self.updates
                .emit(&PaneUpdate::ListSelected(self.list_selection.clone()));
        }
    }

    /// Forgets all selections; used when the document is opened or closed.
    pub fn reset(&mut self) {
        self.tree_selection.clear();
        self.list_nodes.clear();
        self.list_selection.clear();
        self.active_page = None;
        self.pending.clear();
        self.restore = None;
        self.source = ListSource::Children;
        self.updates.emit(&PaneUpdate::TreeSelected(Vec::new()));
        self.updates.emit(&PaneUpdate::ListPopulated(Vec::new()));
        self.updates.emit(&PaneUpdate::ListSelected(Vec::new()));
        self.updates.emit(&PaneUpdate::ActivePage(None));
    }

    fn populate_list(&mut self, nodes: Vec<NodeId>) {
        self.list_nodes = nodes;
        self.list_selection
            .retain(|id| self.list_nodes.contains(id));
        self.repopulations += 1;
        debug!(count = self.list_nodes.len(), "list repopulated");
        self.updates
            .emit(&PaneUpdate::ListPopulated(self.list_nodes.clone()));
    }

    fn apply_list_selection(&mut self, ctx: &mut NavContext<'_>, selection: Vec<NodeId>) {
        let _scope = self.list_guard.enter();
        // Nodes were checked against the tree by the caller.
        if let Err(err) = self.select_in_list(ctx, &selection) {
            debug!(%err, "programmatic list selection rejected");
        }
    }

    fn displayed_pages(&self, tree: &NodeTree) -> Vec<NodeId> {
        self.list_nodes
            .iter()
            .copied()
            .filter(|id| tree.is_page(*id))
            .collect()
    }

    /// Maps queued nodes onto the listing: a displayed node stays, any other
    /// is replaced by its nearest displayed ancestor. The second value keeps
    /// the hidden nodes under the first such ancestor for a later replay.
    fn resolve_displayed(
        &self,
        tree: &NodeTree,
        queued: &[NodeId],
    ) -> (Vec<NodeId>, Option<(NodeId, Vec<NodeId>)>) {
        let mut resolved = Vec::new();
        let mut hidden: Option<(NodeId, Vec<NodeId>)> = None;
        for id in queued {
            let candidate = std::iter::once(*id)
                .chain(tree.ancestors(*id))
                .find(|node| self.list_nodes.contains(node));
            let Some(node) = candidate else {
                continue;
            };
            if !resolved.contains(&node) {
                resolved.push(node);
            }
            if node == *id {
                continue;
            }
            match &mut hidden {
                None => hidden = Some((node, vec![*id])),
                Some((anchor, nodes)) if *anchor == node => nodes.push(*id),
                Some(_) => {}
            }
        }
        (resolved, hidden)
    }
}

fn ensure_known(tree: &NodeTree, nodes: &[NodeId]) -> Result<()> {
    match nodes.iter().find(|id| !tree.contains(**id)) {
        Some(missing) => Err(CoreError::Validation(format!(
            "node {missing} is not part of the notebook"
        ))),
        None => Ok(()),
    }
}

fn same_set(current: &[NodeId], requested: &[NodeId]) -> bool {
    let current: HashSet<NodeId> = current.iter().copied().collect();
    let requested: HashSet<NodeId> = requested.iter().copied().collect();
    current == requested
}

fn dedup(nodes: &[NodeId]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    nodes.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn children_of_folders(tree: &NodeTree, selection: &[NodeId]) -> Vec<NodeId> {
    let mut listed = Vec::new();
    let mut seen = HashSet::new();
    for folder in selection.iter().filter(|id| tree.is_folder(**id)) {
        for child in tree.children(*folder) {
            if seen.insert(*child) {
                listed.push(*child);
            }
        }
    }
    listed
}
