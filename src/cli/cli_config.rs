use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::config::SETTINGS_FILE_NAME;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Shows open projects as a tree annotated with version-control status")]
pub struct Cli {
    /// Open documents; the projects containing them are shown
    pub documents: Vec<PathBuf>,

    /// Expand this directory after the first refresh. May be repeated
    #[clap(long, short)]
    pub expand: Vec<PathBuf>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Settings file
    #[clap(long, short, default_value = SETTINGS_FILE_NAME)]
    pub config: PathBuf,

    /// Where the list of open projects is kept between runs
    #[clap(long)]
    pub state_file: Option<PathBuf>,

    #[clap(long)]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["grove"]).expect("Failed to parse arguments");
        assert!(cli.documents.is_empty());
        assert!(cli.expand.is_empty());
        assert_eq!(cli.config, PathBuf::from("grove.yaml"));
        assert_eq!(cli.state_file, None);
        assert!(matches!(cli.log_level, LogLevel::Warn));
        assert!(!cli.no_color);
    }

    #[test]
    fn expand_may_be_repeated() {
        let cli = Cli::try_parse_from([
            "grove",
            "src/main.rs",
            "--expand",
            "src",
            "-e",
            "docs",
            "--log-level",
            "trace",
            "--no-color",
        ])
        .expect("Failed to parse arguments");
        assert_eq!(cli.documents, vec![PathBuf::from("src/main.rs")]);
        assert_eq!(cli.expand, vec![PathBuf::from("src"), PathBuf::from("docs")]);
        assert!(matches!(cli.log_level, LogLevel::Trace));
        assert!(cli.no_color);
    }
}
