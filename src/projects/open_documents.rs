use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::ext::PathExt;

/// Query interface to whatever owns the open documents (editor tabs).
pub trait OpenDocuments {
    /// Whether some open document lives below `root`.
    fn has_document_under(&self, root: &Path) -> bool;
}

/// Plain set of open document paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSet {
    paths: BTreeSet<PathBuf>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn close(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }
}

impl OpenDocuments for DocumentSet {
    fn has_document_under(&self, root: &Path) -> bool {
        self.paths.iter().any(|path| path.is_strictly_inside(root))
    }
}

impl FromIterator<PathBuf> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}
