//! Version-control status of project files.
//!
//! A [`StatusProbe`] runs the configured status command inside a project root and
//! turns its porcelain output into an immutable [`StatusMap`].

mod status_map;
mod status_probe;
mod status_tag;

pub use status_map::StatusMap;
pub use status_probe::{DEFAULT_METADATA_DIR, DEFAULT_STATUS_COMMAND, StatusProbe};
pub use status_tag::{StatusTag, sort_rank};
