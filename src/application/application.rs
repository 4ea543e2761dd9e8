use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::config::{Settings, SettingsError};
use crate::ext::PathExt;
use crate::projects::{DocumentSet, ProjectRegistry, ProjectStore};
use crate::refresh::{RefreshCoordinator, RefreshCreationError, RefreshOutcome};
use crate::render::TreeRenderer;
use crate::status::StatusProbe;
use crate::workspace::Workspace;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let settings = Settings::read(&app_config.settings_path)
            .await
            .context(SettingsSnafu)?;
        debug!("Loaded settings: {:?}", settings);

        let state_file = app_config
            .state_file
            .clone()
            .unwrap_or_else(|| settings.state_file.clone());
        let store = ProjectStore::new(state_file);
        let saved_projects = store.load().await;
        let registry = ProjectRegistry::new(settings.autoclose_count, store);

        let probe = StatusProbe::new(settings.status_command.clone(), settings.metadata_dir.clone());
        let coordinator = RefreshCoordinator::new(probe, settings.probe_workers)
            .context(RefreshCreationSnafu)?;

        let mut workspace =
            Workspace::new(registry, coordinator, DocumentSet::new(), settings.metadata_dir);
        for document in &app_config.documents {
            workspace.documents_mut().open(document.clone());
        }
        workspace.restore(saved_projects).await;

        for document in &app_config.documents {
            let root = workspace.document_path_assigned(document).await;
            debug!(
                "{} belongs to project {}",
                document.display(),
                root.project_display()
            );
        }

        info!("{} projects open", workspace.registry().roots().len());
        let outcome = workspace.refresh_all().await;
        if outcome != RefreshOutcome::Applied {
            warn!("Statuses are unavailable: refresh ended as {:?}", outcome);
        }

        for dir in &app_config.expand {
            if workspace.expand_path(dir).is_none() {
                warn!("{} is not a directory in an open project", dir.display());
            }
        }

        let changes = workspace.take_changes();
        info!(
            "Rendering {} nodes after {} changes",
            workspace.model().len(),
            changes.len()
        );
        let renderer = TreeRenderer::for_stdout(app_config.no_color);
        print!("{}", renderer.render(workspace.model()));

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Critical failure encountered while starting status workers"))]
    RefreshCreationError { source: RefreshCreationError },
}
