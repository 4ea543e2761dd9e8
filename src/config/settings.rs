use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{
    ext::PathExt,
    projects::{DEFAULT_AUTOCLOSE_COUNT, STANDARD_PROJECT_STATE_PATH},
    status::{DEFAULT_METADATA_DIR, DEFAULT_STATUS_COMMAND},
};

pub const SETTINGS_FILE_NAME: &str = "grove.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Projects beyond this count are closed once no document keeps them open
    pub autoclose_count: usize,
    pub status_command: Vec<String>,
    pub metadata_dir: String,
    pub state_file: PathBuf,
    /// Upper bound for probe workers, defaults to the available parallelism
    pub probe_workers: Option<NonZeroUsize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autoclose_count: DEFAULT_AUTOCLOSE_COUNT,
            status_command: DEFAULT_STATUS_COMMAND.iter().map(|s| s.to_string()).collect(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            state_file: PathBuf::from(STANDARD_PROJECT_STATE_PATH),
            probe_workers: None,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub async fn read(path: &Path) -> Result<Self, SettingsError> {
        debug!("Reading settings file: {}", path.best_effort_path_display());
        let bytes = match compio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No settings file at {}, using defaults",
                    path.best_effort_path_display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                });
            }
        };
        debug!("Successfully read settings file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(NotUtf8Snafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn apply_mapping(&mut self, top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<(), SettingsError> {
        for (key, value) in top_level {
            let Yaml::Value(Scalar::String(key)) = key else {
                debug!("Skipping non-string settings key: {:?}", key);
                continue;
            };
            match &**key {
                "autoclose_count" => self.autoclose_count = positive_integer(key, value)?.get(),
                "status_command" => self.status_command = string_list(key, value)?,
                "metadata_dir" => self.metadata_dir = string(key, value)?,
                "state_file" => self.state_file = PathBuf::from(string(key, value)?),
                "probe_workers" => self.probe_workers = Some(positive_integer(key, value)?),
                other => debug!("Ignoring unknown setting '{}'", other),
            }
        }
        Ok(())
    }
}

fn positive_integer(key: &str, value: &Yaml) -> Result<NonZeroUsize, SettingsError> {
    if let Yaml::Value(Scalar::Integer(n)) = value {
        if let Some(n) = usize::try_from(*n).ok().and_then(NonZeroUsize::new) {
            return Ok(n);
        }
    }
    InvalidValueSnafu {
        key,
        expected: "a positive integer",
    }
    .fail()
}

fn string(key: &str, value: &Yaml) -> Result<String, SettingsError> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => InvalidValueSnafu {
            key,
            expected: "a non-empty string",
        }
        .fail(),
    }
}

fn string_list(key: &str, value: &Yaml) -> Result<Vec<String>, SettingsError> {
    let invalid = || {
        InvalidValueSnafu {
            key,
            expected: "a non-empty list of strings",
        }
        .build()
    };
    let items = value.as_sequence().ok_or_else(invalid)?;
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

impl TryFrom<&str> for Settings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let mut settings = Settings::default();

        // An empty file or a bare `~` means "all defaults"
        let Some(document) = documents.first() else {
            return Ok(settings);
        };
        if let Yaml::Value(Scalar::Null) = document {
            return Ok(settings);
        }

        let top_level = document.as_mapping().ok_or(SettingsError::TopLevelNotMap)?;
        settings.apply_mapping(top_level)?;
        Ok(settings)
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Settings file {} is not valid UTF-8", file_path))]
    NotUtf8Error {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of settings should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Setting '{}' should be {}", key, expected))]
    InvalidValue { key: String, expected: &'static str },
}
