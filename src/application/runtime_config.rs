use std::path::PathBuf;

use crate::cli::Cli;
use crate::ext::absolute_normalized;

/// Command line options resolved against the current directory.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub documents: Vec<PathBuf>,
    pub expand: Vec<PathBuf>,
    pub settings_path: PathBuf,
    /// Overrides the state file from the settings
    pub state_file: Option<PathBuf>,
    pub no_color: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            documents: cli.documents.iter().map(|d| absolute_normalized(d)).collect(),
            expand: cli.expand.iter().map(|d| absolute_normalized(d)).collect(),
            settings_path: cli.config,
            state_file: cli.state_file,
            no_color: cli.no_color,
        }
    }
}
