use std::path::{Path, PathBuf};

use derive_more::{Display, From};

use crate::status::StatusTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("#{_0}")]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    File,
    Directory,
    /// Marks a directory as not expanded yet, or expanded and empty
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub(super) path: Option<PathBuf>,
    pub(super) kind: NodeKind,
    pub(super) tag: Option<StatusTag>,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) expanded: bool,
}

impl TreeNode {
    pub(super) fn entry(path: PathBuf, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            path: Some(path),
            kind,
            tag: None,
            parent,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub(super) fn placeholder(parent: NodeId) -> Self {
        Self {
            path: None,
            kind: NodeKind::Placeholder,
            tag: None,
            parent: Some(parent),
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Path of a file or directory node.
    ///
    /// # Panics
    /// Placeholders have no path; asking for one means the tree is corrupt.
    pub fn path(&self) -> &Path {
        match &self.path {
            Some(path) => path,
            None => panic!("placeholder nodes have no path"),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn tag(&self) -> Option<StatusTag> {
        self.tag
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == NodeKind::Placeholder
    }

    /// Whether the directory has been listed at least once.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}
