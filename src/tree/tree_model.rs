use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::status::StatusTag;
use crate::tree::{NodeId, NodeKind, TreeNode};

/// A single mutation of the model, drained by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Inserted { id: NodeId, parent: Option<NodeId> },
    Removed { id: NodeId },
    TagChanged { id: NodeId, tag: Option<StatusTag> },
    /// Children of `parent` (or the project roots, for `None`) changed order
    Reordered { parent: Option<NodeId> },
    Expanded { id: NodeId },
}

#[derive(Debug, Default)]
pub struct TreeModel {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    next_id: usize,
    changes: Vec<TreeChange>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project root nodes, most recently used first.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    /// # Panics
    /// When `id` is not in the model.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id} is not in the tree model"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        match self.nodes.get_mut(&id) {
            Some(node) => node,
            None => panic!("node {id} is not in the tree model"),
        }
    }

    pub fn path(&self, id: NodeId) -> &Path {
        self.node(id).path()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn tag(&self, id: NodeId) -> Option<StatusTag> {
        self.node(id).tag()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when the directory shows nothing but its placeholder.
    pub fn has_only_placeholder(&self, id: NodeId) -> bool {
        match self.children(id) {
            [only] => self.node(*only).is_placeholder(),
            _ => false,
        }
    }

    pub fn find_root(&self, path: &Path) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.path(*id) == path)
    }

    /// Finds a materialized node by path, descending only through expanded
    /// directories that contain it. The first project (in display order)
    /// holding the path wins when projects are nested.
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        let mut candidates = self.roots.clone();
        while let Some(id) = candidates.first().copied() {
            candidates.remove(0);
            let node = self.node(id);
            if node.is_placeholder() || !path.starts_with(node.path()) {
                continue;
            }
            if node.path() == path {
                return Some(id);
            }
            let mut nested = node.children.clone();
            nested.extend(candidates);
            candidates = nested;
        }
        None
    }

    fn allocate(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId::from(self.next_id);
        self.next_id += 1;
        self.changes.push(TreeChange::Inserted {
            id,
            parent: node.parent,
        });
        self.nodes.insert(id, node);
        id
    }

    /// Shows `path` as the first project, creating it with a placeholder if it
    /// is not in the forest yet. Existing projects keep their subtree.
    pub fn insert_project(&mut self, path: PathBuf) -> NodeId {
        let id = match self.find_root(&path) {
            Some(existing) => existing,
            None => self.create_project_node(path),
        };
        if self.roots.first() != Some(&id) {
            self.roots.retain(|root| *root != id);
            self.roots.insert(0, id);
            self.changes.push(TreeChange::Reordered { parent: None });
        }
        id
    }

    /// Makes the project nodes match `paths`, in that order. Projects that
    /// stay keep their subtrees, dropped ones are removed.
    pub fn set_projects(&mut self, paths: &[PathBuf]) {
        for id in self.roots.clone() {
            if !paths.iter().any(|path| path == self.path(id)) {
                debug!("Removing project node for {}", self.path(id).display());
                self.remove(id);
            }
        }

        let order = paths
            .iter()
            .map(|path| match self.find_root(path) {
                Some(id) => id,
                None => self.create_project_node(path.clone()),
            })
            .collect::<Vec<_>>();

        if self.roots != order {
            self.roots = order;
            self.changes.push(TreeChange::Reordered { parent: None });
        }
    }

    fn create_project_node(&mut self, path: PathBuf) -> NodeId {
        debug!("Adding project node for {}", path.display());
        let id = self.allocate(TreeNode::entry(path, NodeKind::Directory, None));
        self.insert_placeholder(id);
        id
    }

    /// Appends a file or directory under `parent`. Directories start out with
    /// a placeholder child.
    pub fn insert_child(&mut self, parent: NodeId, path: PathBuf, kind: NodeKind) -> NodeId {
        assert!(
            kind != NodeKind::Placeholder,
            "placeholders are inserted with insert_placeholder"
        );
        assert!(
            !self.has_only_placeholder(parent),
            "inserting next to a placeholder under {}",
            self.path(parent).display()
        );

        let id = self.allocate(TreeNode::entry(path, kind, Some(parent)));
        self.node_mut(parent).children.push(id);
        if kind == NodeKind::Directory {
            self.insert_placeholder(id);
        }
        id
    }

    pub fn insert_placeholder(&mut self, parent: NodeId) -> NodeId {
        assert!(
            self.children(parent).is_empty(),
            "placeholder added to a non-empty directory {}",
            self.path(parent).display()
        );
        let id = self.allocate(TreeNode::placeholder(parent));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Removes a node together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        let parent = self.node(id).parent;
        match parent {
            Some(parent) => self.node_mut(parent).children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }
        self.changes.push(TreeChange::Removed { id });
    }

    /// Sets the status tag, returning whether it changed.
    pub fn set_tag(&mut self, id: NodeId, tag: Option<StatusTag>) -> bool {
        let node = self.node_mut(id);
        if node.tag == tag {
            return false;
        }
        node.tag = tag;
        self.changes.push(TreeChange::TagChanged { id, tag });
        true
    }

    pub fn set_expanded(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        assert!(node.is_directory(), "only directories can be expanded");
        if !node.expanded {
            node.expanded = true;
            self.changes.push(TreeChange::Expanded { id });
        }
    }

    /// Replaces the child order of `parent`. `order` must be a permutation of
    /// the current children. Returns whether anything moved.
    pub fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) -> bool {
        let node = self.node_mut(parent);
        assert_eq!(
            node.children.len(),
            order.len(),
            "reordering must keep every child"
        );
        assert!(
            order.iter().all(|id| node.children.contains(id)),
            "reordering must keep every child"
        );
        if node.children == order {
            return false;
        }
        node.children = order;
        self.changes.push(TreeChange::Reordered {
            parent: Some(parent),
        });
        true
    }

    /// Hands pending mutations to the presentation layer.
    pub fn take_changes(&mut self) -> Vec<TreeChange> {
        std::mem::take(&mut self.changes)
    }
}
