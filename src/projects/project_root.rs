use std::path::{Path, PathBuf};

/// Project a document belongs to: the closest ancestor directory holding the
/// version-control metadata dir, or the document's own directory.
///
/// Only used to pick a project for a newly opened document. It knows nothing
/// about nested projects already shown in the tree.
pub fn find_project_root(document: &Path, metadata_dir: &str) -> PathBuf {
    document
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(metadata_dir).exists())
        .or_else(|| document.parent())
        .unwrap_or(document)
        .to_path_buf()
}
