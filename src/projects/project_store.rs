use std::path::PathBuf;

use bincode::{Decode, Encode};
use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::ext::PathExt;

pub const STANDARD_PROJECT_STATE_PATH: &str = ".grove/projects.bincode";

#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
struct PersistedProjects {
    paths: Vec<String>,
}

/// Durable list of project roots, most recently used first.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    file_path: PathBuf,
}

impl ProjectStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Reads the saved project list. A missing or unreadable file means no
    /// projects were saved.
    pub async fn load(&self) -> Vec<PathBuf> {
        debug!(
            "Reading saved projects from {}",
            self.file_path.best_effort_path_display()
        );
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                info!("No saved projects found, starting fresh");
                return Vec::new();
            }
        };

        match bincode::decode_from_slice::<PersistedProjects, _>(&bytes, bincode::config::standard())
        {
            Ok((persisted, _)) => {
                debug!("Loaded {} saved projects", persisted.paths.len());
                persisted.paths.into_iter().map(PathBuf::from).collect()
            }
            Err(e) => {
                warn!(
                    "Ignoring corrupt project state in {}: {}",
                    self.file_path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    pub async fn save(&self, roots: &[PathBuf]) -> Result<(), ProjectStoreError> {
        let persisted = PersistedProjects {
            paths: roots
                .iter()
                .map(|root| root.to_string_lossy().into_owned())
                .collect(),
        };
        let bytes = bincode::encode_to_vec(&persisted, bincode::config::standard())
            .context(EncodeSnafu)?;

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.context(CreateDirSnafu {
                path: parent.to_path_buf(),
            })?;
        }

        fs::write(&self.file_path, bytes)
            .await
            .0
            .context(WriteSnafu {
                path: self.file_path.clone(),
            })?;
        debug!("Saved {} projects", roots.len());
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ProjectStoreError {
    #[snafu(display("Failed to encode the project list"))]
    EncodeError {
        source: bincode::error::EncodeError,
    },
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write project state to {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}
