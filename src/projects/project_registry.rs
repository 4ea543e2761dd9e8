use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::ext::PathExt;
use crate::projects::{OpenDocuments, ProjectStore, ProjectStoreError};

/// Above this many projects the least recently used one gets closed, unless a
/// document is open from it.
pub const DEFAULT_AUTOCLOSE_COUNT: usize = 5;

/// Ordered set of open project roots, most recently used first.
///
/// Nested roots are kept as separate projects.
#[derive(Debug)]
pub struct ProjectRegistry {
    roots: Vec<PathBuf>,
    cap: usize,
    store: ProjectStore,
}

impl ProjectRegistry {
    pub fn new(cap: usize, store: ProjectStore) -> Self {
        Self {
            roots: Vec::new(),
            cap,
            store,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Tracks `path` as the most recently used project, then evicts and saves.
    ///
    /// Returns whether the project was new.
    pub async fn add_project(&mut self, path: PathBuf, documents: &impl OpenDocuments) -> bool {
        let added = self.move_to_front(path);
        self.evict_stale(documents).await;
        added
    }

    /// Drops vanished projects, then closes least recently used projects
    /// without open documents until at most `cap` remain. Saves the result.
    pub async fn evict_stale(&mut self, documents: &impl OpenDocuments) -> Vec<PathBuf> {
        let evicted = self.evict(documents);
        self.persist_logged().await;
        evicted
    }

    /// Re-opens saved projects at startup. Paths that are not absolute or no
    /// longer directories are skipped.
    pub async fn restore(&mut self, paths: Vec<PathBuf>, documents: &impl OpenDocuments) {
        // The first saved path is the most recent one, so it goes in last
        let restorable = paths.into_iter().take(self.cap).collect::<Vec<_>>();
        for path in restorable.into_iter().rev() {
            if path.is_absolute() && path.is_dir() {
                self.move_to_front(path);
            } else {
                debug!("Not restoring project {}", path.display());
            }
        }
        self.evict_stale(documents).await;
    }

    pub async fn persist(&self) -> Result<(), ProjectStoreError> {
        self.store.save(&self.roots).await
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            error!("Failed to save open projects: {}", snafu::Report::from_error(e));
        }
    }

    fn move_to_front(&mut self, path: PathBuf) -> bool {
        match self.roots.iter().position(|root| *root == path) {
            Some(index) => {
                let existing = self.roots.remove(index);
                self.roots.insert(0, existing);
                false
            }
            None => {
                info!("Opening project {}", path.project_display());
                self.roots.insert(0, path);
                true
            }
        }
    }

    fn evict(&mut self, documents: &impl OpenDocuments) -> Vec<PathBuf> {
        let mut evicted = Vec::new();

        self.roots.retain(|root| {
            let exists = root.is_dir();
            if !exists {
                info!("Project {} no longer exists", root.display());
                evicted.push(root.clone());
            }
            exists
        });

        let mut index = self.roots.len();
        while self.roots.len() > self.cap && index > 0 {
            index -= 1;
            if !documents.has_document_under(&self.roots[index]) {
                let root = self.roots.remove(index);
                info!("Closing least recently used project {}", root.project_display());
                evicted.push(root);
            }
        }

        evicted
    }
}
