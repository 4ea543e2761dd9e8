use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::status::{StatusMap, StatusTag, sort_rank};
use crate::tree::{NodeId, NodeKind, TreeModel};

/// Installed status snapshots, keyed by project root.
pub type StatusMaps = HashMap<PathBuf, Arc<StatusMap>>;

/// Makes materialized parts of a [`TreeModel`] match the filesystem and the
/// latest status snapshots.
///
/// Every mutation goes through the model, which only records real changes, so
/// reconciling an unchanged tree twice leaves the second pass without changes.
pub struct TreeSynchronizer<'a> {
    model: &'a mut TreeModel,
    status_maps: &'a StatusMaps,
    project_roots: HashSet<PathBuf>,
}

impl<'a> TreeSynchronizer<'a> {
    pub fn new(model: &'a mut TreeModel, status_maps: &'a StatusMaps) -> Self {
        let project_roots = model
            .roots()
            .iter()
            .map(|id| model.path(*id).to_path_buf())
            .collect();

        Self {
            model,
            status_maps,
            project_roots,
        }
    }

    /// Refreshes every project from its root node down.
    ///
    /// Project nodes keep their order and are not listed themselves; only
    /// directories that were already expanded get listed again.
    pub fn reconcile_all(&mut self) {
        let roots = self.model.roots().to_vec();
        debug!("Reconciling {} projects", roots.len());
        self.refresh_children(&roots);
    }

    /// Lists `dir` and brings its children, their statuses and their order up
    /// to date, then descends into expanded subdirectories.
    pub fn reconcile_directory(&mut self, dir: NodeId) {
        assert!(
            self.model.node(dir).is_directory(),
            "only directories can be reconciled"
        );
        let dir_path = self.model.path(dir).to_path_buf();
        let listing = list_directory(&dir_path);
        self.model.set_expanded(dir);

        if listing.is_empty() {
            self.show_empty(dir);
            return;
        }

        if self.model.has_only_placeholder(dir) {
            let placeholder = self.model.children(dir)[0];
            self.model.remove(placeholder);
        }

        let existing = self
            .model
            .children(dir)
            .iter()
            .map(|id| {
                let node = self.model.node(*id);
                (node.path().to_path_buf(), (*id, node.kind()))
            })
            .collect::<HashMap<_, _>>();

        for (path, (id, kind)) in &existing {
            match listing.get(path) {
                Some(listed_kind) if listed_kind == kind => {}
                _ => {
                    debug!("Removing {} from the tree", path.display());
                    self.model.remove(*id);
                }
            }
        }

        let mut appeared = listing
            .into_iter()
            .filter(|(path, kind)| {
                existing
                    .get(path)
                    .is_none_or(|(_, existing_kind)| existing_kind != kind)
            })
            .collect::<Vec<_>>();
        appeared.sort();
        for (path, kind) in appeared {
            self.model.insert_child(dir, path, kind);
        }

        let children = self.model.children(dir).to_vec();
        self.refresh_children(&children);
        self.sort_children(dir);
    }

    fn show_empty(&mut self, dir: NodeId) {
        if self.model.has_only_placeholder(dir) {
            return;
        }
        for child in self.model.children(dir).to_vec() {
            self.model.remove(child);
        }
        self.model.insert_placeholder(dir);
    }

    fn refresh_children(&mut self, children: &[NodeId]) {
        for &child in children {
            let node = self.model.node(child);
            let is_directory = node.is_directory();
            let tag = self.compute_status(node.path(), is_directory);
            self.model.set_tag(child, tag);

            if is_directory && self.model.node(child).is_expanded() {
                self.reconcile_directory(child);
            }
        }
    }

    /// Status for `path`: the closest entry on the way up to its project root,
    /// or for directories an aggregate of everything below.
    fn compute_status(&self, path: &Path, is_directory: bool) -> Option<StatusTag> {
        let root = path
            .ancestors()
            .find(|candidate| self.project_roots.contains(*candidate))
            .unwrap_or_else(|| panic!("{} is not inside any project", path.display()));

        let status_map = self.status_maps.get(root)?;

        for candidate in path.ancestors() {
            if let Some(tag) = status_map.get(candidate) {
                return Some(tag);
            }
            if candidate == root {
                break;
            }
        }

        if is_directory {
            aggregate_descendant_statuses(&status_map.descendant_statuses(path))
        } else {
            None
        }
    }

    fn sort_children(&mut self, dir: NodeId) {
        let children = self.model.children(dir);
        if children.len() < 2 {
            return;
        }

        let mut keyed = children
            .iter()
            .map(|id| {
                let node = self.model.node(*id);
                let kind_rank = if node.is_directory() { 1 } else { 2 };
                let key = (
                    sort_rank(node.tag()),
                    kind_rank,
                    node.path().to_string_lossy().into_owned(),
                );
                (key, *id)
            })
            .collect::<Vec<_>>();
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

        let order = keyed.into_iter().map(|(_, id)| id).collect();
        self.model.reorder_children(dir, order);
    }
}

/// Status shown on a directory with no entry of its own.
///
/// Merge conflicts beat modifications; otherwise the directory only gets a
/// status when everything below it agrees on one.
pub fn aggregate_descendant_statuses(statuses: &HashSet<StatusTag>) -> Option<StatusTag> {
    if statuses.contains(&StatusTag::MergeConflict) {
        Some(StatusTag::MergeConflict)
    } else if statuses.contains(&StatusTag::Modified) {
        Some(StatusTag::Modified)
    } else if statuses.len() == 1 {
        statuses.iter().next().copied()
    } else {
        None
    }
}

fn list_directory(dir: &Path) -> HashMap<PathBuf, NodeKind> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Can't list directory {}: {}", dir.display(), e);
            return HashMap::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let path = entry.path();
                let kind = if path.is_dir() {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                };
                Some((path, kind))
            }
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusProbe;
    use rstest::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, "").expect("Failed to create file");
    }

    fn mkdir(path: &Path) {
        fs::create_dir_all(path).expect("Failed to create directory");
    }

    fn maps_for(root: &Path, entries: &[(&str, StatusTag)]) -> StatusMaps {
        let map = entries
            .iter()
            .map(|(relative, tag)| (root.join(relative), *tag))
            .collect::<StatusMap>();
        HashMap::from([(root.to_path_buf(), Arc::new(map))])
    }

    fn child_names(model: &TreeModel, dir: NodeId) -> Vec<String> {
        model
            .children(dir)
            .iter()
            .map(|id| {
                let node = model.node(*id);
                if node.is_placeholder() {
                    "(empty)".to_string()
                } else {
                    node.path()
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default()
                }
            })
            .collect()
    }

    fn child_named(model: &TreeModel, dir: NodeId, name: &str) -> NodeId {
        model
            .children(dir)
            .iter()
            .copied()
            .find(|id| model.path(*id).file_name().is_some_and(|n| n == name))
            .expect("child not found")
    }

    fn project(temp_dir: &TempDir) -> (TreeModel, NodeId) {
        let mut model = TreeModel::new();
        let root = model.insert_project(temp_dir.path().to_path_buf());
        (model, root)
    }

    #[rstest]
    #[case(&[StatusTag::Modified, StatusTag::Untracked], Some(StatusTag::Modified))]
    #[case(&[StatusTag::Untracked], Some(StatusTag::Untracked))]
    #[case(&[StatusTag::Untracked, StatusTag::Ignored], None)]
    #[case(&[StatusTag::MergeConflict, StatusTag::Modified, StatusTag::Added], Some(StatusTag::MergeConflict))]
    #[case(&[StatusTag::Added, StatusTag::Untracked], None)]
    #[case(&[StatusTag::Added], Some(StatusTag::Added))]
    #[case(&[], None)]
    fn aggregates_descendant_statuses(
        #[case] statuses: &[StatusTag],
        #[case] expected: Option<StatusTag>,
    ) {
        let statuses = statuses.iter().copied().collect::<HashSet<_>>();
        assert_eq!(aggregate_descendant_statuses(&statuses), expected);
    }

    #[test]
    fn directory_with_two_untracked_descendants_is_untracked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join("dir"));
        touch(&root_path.join("dir/a"));
        touch(&root_path.join("dir/b"));
        let maps = maps_for(
            root_path,
            &[("dir/a", StatusTag::Untracked), ("dir/b", StatusTag::Untracked)],
        );
        let (mut model, root) = project(&temp_dir);

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        let dir = child_named(&model, root, "dir");
        assert_eq!(model.tag(dir), Some(StatusTag::Untracked));
    }

    #[test]
    fn clean_repository_root_has_no_status() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join(".git"));
        mkdir(&root_path.join("crate_a/src"));
        touch(&root_path.join("crate_a/src/lib.rs"));
        let status_map = StatusProbe::default().parse_output(root_path, "");
        let maps = StatusMaps::from([(root_path.to_path_buf(), Arc::new(status_map))]);
        let (mut model, root) = project(&temp_dir);

        let mut synchronizer = TreeSynchronizer::new(&mut model, &maps);
        synchronizer.reconcile_all();
        synchronizer.reconcile_directory(root);

        assert_eq!(model.tag(root), None);
        assert_eq!(model.tag(child_named(&model, root, "crate_a")), None);
        assert_eq!(
            model.tag(child_named(&model, root, ".git")),
            Some(StatusTag::Ignored)
        );
    }

    #[test]
    fn untracked_file_outweighs_metadata_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join(".git"));
        touch(&root_path.join("notes.txt"));
        let status_map = StatusProbe::default().parse_output(root_path, "?? notes.txt\n");
        let maps = StatusMaps::from([(root_path.to_path_buf(), Arc::new(status_map))]);
        let (mut model, root) = project(&temp_dir);

        TreeSynchronizer::new(&mut model, &maps).reconcile_all();

        assert_eq!(model.tag(root), Some(StatusTag::Untracked));
    }

    #[test]
    fn expanding_replaces_placeholder_with_listing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(&temp_dir.path().join("file.txt"));
        mkdir(&temp_dir.path().join("src"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        assert_eq!(child_names(&model, root), vec!["src", "file.txt"]);
        let src = child_named(&model, root, "src");
        assert!(model.has_only_placeholder(src));
        assert!(!model.node(src).is_expanded());
        assert!(model.node(root).is_expanded());
    }

    #[test]
    fn second_reconciliation_makes_no_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join("src/nested"));
        mkdir(&root_path.join("empty"));
        touch(&root_path.join("src/lib.rs"));
        touch(&root_path.join("README.md"));
        let maps = maps_for(
            root_path,
            &[("src/lib.rs", StatusTag::Modified), ("README.md", StatusTag::Added)],
        );
        let (mut model, root) = project(&temp_dir);
        {
            let mut synchronizer = TreeSynchronizer::new(&mut model, &maps);
            synchronizer.reconcile_directory(root);
        }
        let src = child_named(&model, root, "src");
        let empty = child_named(&model, root, "empty");
        {
            let mut synchronizer = TreeSynchronizer::new(&mut model, &maps);
            synchronizer.reconcile_directory(src);
            synchronizer.reconcile_directory(empty);
            synchronizer.reconcile_all();
        }
        model.take_changes();

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);
        assert_eq!(model.take_changes(), Vec::new());

        TreeSynchronizer::new(&mut model, &maps).reconcile_all();
        assert_eq!(model.take_changes(), Vec::new());
    }

    #[test]
    fn direct_entry_beats_descendant_aggregate() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join("vendor"));
        touch(&root_path.join("vendor/patched.c"));
        let maps = maps_for(
            root_path,
            &[
                ("vendor", StatusTag::Untracked),
                ("vendor/patched.c", StatusTag::MergeConflict),
            ],
        );
        let (mut model, root) = project(&temp_dir);

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        let vendor = child_named(&model, root, "vendor");
        assert_eq!(model.tag(vendor), Some(StatusTag::Untracked));
    }

    #[test]
    fn children_inherit_closest_ancestor_entry() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join("build/out"));
        touch(&root_path.join("build/out/app"));
        touch(&root_path.join("build/keep"));
        let maps = maps_for(
            root_path,
            &[("build", StatusTag::Ignored), ("build/keep", StatusTag::Added)],
        );
        let (mut model, root) = project(&temp_dir);
        let mut synchronizer = TreeSynchronizer::new(&mut model, &maps);
        synchronizer.reconcile_directory(root);
        let build = child_named(synchronizer.model, root, "build");
        synchronizer.reconcile_directory(build);

        let out = child_named(&model, build, "out");
        let keep = child_named(&model, build, "keep");
        assert_eq!(model.tag(out), Some(StatusTag::Ignored));
        assert_eq!(model.tag(keep), Some(StatusTag::Added));
    }

    #[test]
    fn sorts_by_status_then_kind_then_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        touch(&root_path.join("aaa_ignored.txt"));
        mkdir(&root_path.join("zzz_added"));
        mkdir(&root_path.join("mmm_plain"));
        let maps = maps_for(
            root_path,
            &[
                ("aaa_ignored.txt", StatusTag::Ignored),
                ("zzz_added", StatusTag::Added),
            ],
        );
        let (mut model, root) = project(&temp_dir);

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        assert_eq!(
            child_names(&model, root),
            vec!["zzz_added", "mmm_plain", "aaa_ignored.txt"]
        );
    }

    #[test]
    fn directories_precede_files_with_equal_status() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        touch(&root_path.join("a.txt"));
        touch(&root_path.join("c.txt"));
        mkdir(&root_path.join("b"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        assert_eq!(child_names(&model, root), vec!["b", "a.txt", "c.txt"]);
    }

    #[test]
    fn tracks_appearing_and_vanishing_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        touch(&root_path.join("old.txt"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);
        let old = child_named(&model, root, "old.txt");

        fs::remove_file(root_path.join("old.txt")).expect("Failed to remove file");
        touch(&root_path.join("new.txt"));
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        assert_eq!(child_names(&model, root), vec!["new.txt"]);
        assert!(model.get(old).is_none());
    }

    #[test]
    fn file_replaced_by_directory_changes_kind() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        touch(&root_path.join("thing"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        fs::remove_file(root_path.join("thing")).expect("Failed to remove file");
        mkdir(&root_path.join("thing"));
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        let thing = child_named(&model, root, "thing");
        assert_eq!(model.node(thing).kind(), NodeKind::Directory);
        assert!(model.has_only_placeholder(thing));
    }

    #[test]
    fn emptied_directory_falls_back_to_placeholder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        touch(&root_path.join("only.txt"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        fs::remove_file(root_path.join("only.txt")).expect("Failed to remove file");
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);
        assert!(model.has_only_placeholder(root));
        model.take_changes();

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);
        assert!(model.take_changes().is_empty());
    }

    #[test]
    fn full_refresh_does_not_expand_collapsed_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path();
        mkdir(&root_path.join("src"));
        touch(&root_path.join("src/main.rs"));
        let maps = maps_for(root_path, &[("src/main.rs", StatusTag::Modified)]);
        let (mut model, root) = project(&temp_dir);

        TreeSynchronizer::new(&mut model, &maps).reconcile_all();
        assert!(model.has_only_placeholder(root));
        assert_eq!(model.tag(root), Some(StatusTag::Modified));

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);
        TreeSynchronizer::new(&mut model, &maps).reconcile_all();
        let src = child_named(&model, root, "src");
        assert!(model.has_only_placeholder(src));
        assert_eq!(model.tag(src), Some(StatusTag::Modified));
    }

    #[test]
    fn nested_project_uses_its_own_status_map() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let outer = temp_dir.path().to_path_buf();
        let inner = outer.join("inner");
        mkdir(&inner);
        touch(&inner.join("lib.rs"));

        let mut maps = maps_for(&outer, &[("inner", StatusTag::Untracked)]);
        maps.extend(maps_for(&inner, &[("lib.rs", StatusTag::Modified)]));

        let mut model = TreeModel::new();
        let outer_id = model.insert_project(outer.clone());
        let inner_id = model.insert_project(inner.clone());
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(outer_id);
        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(inner_id);

        let inner_in_outer = child_named(&model, outer_id, "inner");
        let lib = child_named(&model, inner_id, "lib.rs");
        assert_eq!(model.tag(lib), Some(StatusTag::Modified));
        // The inner project node answers to its own map, with no own entry
        assert_eq!(model.tag(inner_in_outer), Some(StatusTag::Modified));
        assert_eq!(model.roots(), &[inner_id, outer_id]);
    }

    #[test]
    fn project_without_status_map_has_no_tags() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(&temp_dir.path().join("a.txt"));
        let (mut model, root) = project(&temp_dir);
        let maps = StatusMaps::new();

        TreeSynchronizer::new(&mut model, &maps).reconcile_directory(root);

        let a = child_named(&model, root, "a.txt");
        assert_eq!(model.tag(a), None);
    }
}
