use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::status::StatusTag;

/// Snapshot of one probe run: absolute path to status.
///
/// Built once from probe output and never mutated afterwards. A refresh replaces
/// the whole map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMap {
    entries: HashMap<PathBuf, StatusTag>,
    /// Added by the probe rather than reported, so it never feeds aggregates
    metadata_dir: Option<PathBuf>,
}

impl StatusMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Marks the repository metadata directory as ignored, replacing any
    /// reported status for it.
    pub fn with_metadata_dir(mut self, metadata_dir: PathBuf) -> Self {
        self.entries.insert(metadata_dir.clone(), StatusTag::Ignored);
        self.metadata_dir = Some(metadata_dir);
        self
    }

    /// Status recorded exactly at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<StatusTag> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct statuses recorded strictly below `dir`, leaving out the
    /// metadata directory.
    pub fn descendant_statuses(&self, dir: &Path) -> HashSet<StatusTag> {
        self.entries
            .iter()
            .filter(|(path, _)| path.as_path() != dir && path.starts_with(dir))
            .filter(|(path, _)| self.metadata_dir.as_ref() != Some(*path))
            .map(|(_, tag)| *tag)
            .collect()
    }
}

impl FromIterator<(PathBuf, StatusTag)> for StatusMap {
    fn from_iter<I: IntoIterator<Item = (PathBuf, StatusTag)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            metadata_dir: None,
        }
    }
}
