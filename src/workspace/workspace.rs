use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::ext::absolute_normalized;
use crate::projects::{DocumentSet, OpenDocuments, ProjectRegistry, find_project_root};
use crate::refresh::{CompletedRefresh, PendingRefresh, RefreshCoordinator, RefreshOutcome};
use crate::sync::TreeSynchronizer;
use crate::tree::{NodeId, NodeKind, TreeChange, TreeModel};

/// Result of the user activating (double-clicking) a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The presentation layer should open this file in an editor
    OpenFile(PathBuf),
    Expanded,
    /// Placeholders do nothing
    Nothing,
}

pub struct Workspace<D: OpenDocuments = DocumentSet> {
    registry: ProjectRegistry,
    model: TreeModel,
    coordinator: RefreshCoordinator,
    documents: D,
    metadata_dir: String,
}

impl<D: OpenDocuments> Workspace<D> {
    pub fn new(
        registry: ProjectRegistry,
        coordinator: RefreshCoordinator,
        documents: D,
        metadata_dir: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            model: TreeModel::new(),
            coordinator,
            documents,
            metadata_dir: metadata_dir.into(),
        }
    }

    pub fn model(&self) -> &TreeModel {
        &self.model
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn documents_mut(&mut self) -> &mut D {
        &mut self.documents
    }

    /// Mutations since the last call, for the presentation layer to apply.
    pub fn take_changes(&mut self) -> Vec<TreeChange> {
        self.model.take_changes()
    }

    /// Re-opens projects saved by an earlier session.
    pub async fn restore(&mut self, saved: Vec<PathBuf>) {
        self.registry.restore(saved, &self.documents).await;
        self.model.set_projects(self.registry.roots());
    }

    /// A document got a path (opened or saved under a new name): its project
    /// becomes the most recently used one.
    pub async fn document_path_assigned(&mut self, document: &Path) -> PathBuf {
        let document = absolute_normalized(document);
        let root = find_project_root(&document, &self.metadata_dir);
        self.add_project(root.clone()).await;
        root
    }

    /// Makes `root` the most recently used project. A project that was not
    /// open yet gets its statuses right away.
    pub async fn add_project(&mut self, root: PathBuf) -> bool {
        let added = self.registry.add_project(root, &self.documents).await;
        self.model.set_projects(self.registry.roots());
        if added {
            self.refresh_all().await;
        }
        added
    }

    /// A document went away, which may make its project evictable.
    pub async fn document_closed(&mut self) {
        self.evict_stale().await;
    }

    pub async fn document_saved(&mut self) -> RefreshOutcome {
        self.refresh_all().await
    }

    /// Switching back to a document may follow changes made elsewhere.
    pub async fn document_focused(&mut self) -> RefreshOutcome {
        self.refresh_all().await
    }

    async fn evict_stale(&mut self) {
        let evicted = self.registry.evict_stale(&self.documents).await;
        if !evicted.is_empty() {
            debug!("Evicted {} projects", evicted.len());
        }
        self.model.set_projects(self.registry.roots());
    }

    /// Probes every project and reconciles the whole forest with the result.
    pub async fn refresh_all(&mut self) -> RefreshOutcome {
        debug!("Refreshing begins");
        let Some(pending) = self.begin_refresh().await else {
            return RefreshOutcome::Failed;
        };
        debug!("Waiting for refresh cycle {}", pending.cycle());
        let completed = pending.wait().await;
        self.finish_refresh(completed)
    }

    /// First half of [`Self::refresh_all`]: evicts, snapshots the projects and
    /// starts the probes. Other events may be handled before finishing.
    pub async fn begin_refresh(&mut self) -> Option<PendingRefresh> {
        self.evict_stale().await;
        let snapshot = self.registry.roots().to_vec();
        match self.coordinator.begin_refresh(snapshot) {
            Ok(pending) => Some(pending),
            Err(e) => {
                error!("Can't start refresh\n{}", snafu::Report::from_error(e));
                None
            }
        }
    }

    pub fn finish_refresh(&mut self, completed: CompletedRefresh) -> RefreshOutcome {
        self.coordinator
            .finish_refresh(completed, self.registry.roots(), &mut self.model)
    }

    /// The user opened directory `id` in the tree.
    pub fn directory_expanded(&mut self, id: NodeId) {
        let status_maps = self.coordinator.status_maps();
        TreeSynchronizer::new(&mut self.model, &status_maps).reconcile_directory(id);
    }

    /// The user double-clicked node `id`.
    pub fn node_activated(&mut self, id: NodeId) -> Activation {
        match self.model.node(id).kind() {
            NodeKind::Directory => {
                self.directory_expanded(id);
                Activation::Expanded
            }
            NodeKind::File => Activation::OpenFile(self.model.path(id).to_path_buf()),
            NodeKind::Placeholder => Activation::Nothing,
        }
    }

    /// Expands every directory from the enclosing project down to `path`.
    /// Returns `None` when `path` is not a directory inside an open project.
    pub fn expand_path(&mut self, path: &Path) -> Option<NodeId> {
        let mut current = self
            .model
            .roots()
            .iter()
            .copied()
            .find(|id| path.starts_with(self.model.path(*id)))?;

        loop {
            if !self.model.node(current).is_expanded() {
                self.directory_expanded(current);
            }
            if self.model.path(current) == path {
                return Some(current);
            }
            current = self
                .model
                .children(current)
                .iter()
                .copied()
                .find(|id| {
                    let node = self.model.node(*id);
                    node.is_directory() && path.starts_with(node.path())
                })?;
        }
    }
}
