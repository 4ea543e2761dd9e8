use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use compio::process::Command;
use tracing::{debug, info, warn};

use crate::ext::PathExt;
use crate::status::{StatusMap, StatusTag};

pub const DEFAULT_STATUS_COMMAND: [&str; 4] = ["git", "status", "--ignored", "--porcelain"];
pub const DEFAULT_METADATA_DIR: &str = ".git";

/// Runs the status command inside a project root.
///
/// Every failure mode (command missing, not a repository, undecodable output)
/// yields an empty [`StatusMap`]; callers never see an error.
#[derive(Debug, Clone)]
pub struct StatusProbe {
    program: String,
    args: Vec<String>,
    metadata_dir: String,
}

impl Default for StatusProbe {
    fn default() -> Self {
        Self::new(
            DEFAULT_STATUS_COMMAND.iter().map(|s| s.to_string()).collect(),
            DEFAULT_METADATA_DIR,
        )
    }
}

impl StatusProbe {
    /// `command` holds the program followed by its arguments. An empty command
    /// falls back to the default one.
    pub fn new(command: Vec<String>, metadata_dir: impl Into<String>) -> Self {
        let mut command = command.into_iter();
        match command.next() {
            Some(program) => Self {
                program,
                args: command.collect(),
                metadata_dir: metadata_dir.into(),
            },
            None => Self {
                metadata_dir: metadata_dir.into(),
                ..Self::default()
            },
        }
    }

    pub async fn probe(&self, root: &Path) -> StatusMap {
        let start = Instant::now();
        let mut cmd = self.create_command(root);

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    "Can't run status command '{}' in {}: {}",
                    self.program,
                    root.best_effort_path_display(),
                    e
                );
                return StatusMap::empty();
            }
        };
        debug!(
            "Status command in {} ran in {}ms",
            root.display(),
            start.elapsed().as_millis()
        );

        if !output.status.success() {
            // Most commonly the root is not under version control
            info!(
                "Status command failed in {} with exit code {}: {}",
                root.display(),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return StatusMap::empty();
        }

        match String::from_utf8(output.stdout) {
            Ok(stdout) => self.parse_output(root, &stdout),
            Err(e) => {
                warn!(
                    "Status output for {} is not valid UTF-8: {}",
                    root.display(),
                    e
                );
                StatusMap::empty()
            }
        }
    }

    /// Parses porcelain output produced in `root`.
    pub fn parse_output(&self, root: &Path, stdout: &str) -> StatusMap {
        // The metadata dir is never reported but should render de-emphasized
        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| parse_porcelain_line(root, line))
            .collect::<StatusMap>()
            .with_metadata_dir(root.join(&self.metadata_dir))
    }

    fn create_command(&self, root: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.current_dir(root);
        let _ = cmd.stdin(Stdio::null());
        let _ = cmd.stdout(Stdio::piped());
        let _ = cmd.stderr(Stdio::piped());
        cmd
    }
}

/// Parses a single `XY path` porcelain line into an absolute path and its status.
pub fn parse_porcelain_line(root: &Path, line: &str) -> Option<(PathBuf, StatusTag)> {
    let (code, raw_path) = match (line.get(..2), line.get(3..)) {
        (Some(code), Some(raw_path)) if !raw_path.is_empty() => (code, raw_path),
        _ => {
            warn!("Unknown status line: {:?}", line);
            return None;
        }
    };

    let tag = match code.as_bytes() {
        b"??" => StatusTag::Untracked,
        b"!!" => StatusTag::Ignored,
        b"AA" | b"UU" => StatusTag::MergeConflict,
        [_, b'M'] | [b'M', b' '] => StatusTag::Modified,
        [first, b' '] if *first != b' ' => StatusTag::Added,
        _ => {
            warn!("Unknown status line: {:?}", line);
            return None;
        }
    };

    // Renames are reported as "old -> new"
    let raw_path = raw_path
        .rsplit_once(" -> ")
        .map_or(raw_path, |(_, new_path)| new_path);
    let relative = unquote(raw_path);
    let relative = relative.trim_end_matches('/');

    Some((root.join(relative), tag))
}

/// Undoes the C-style quoting used for paths with special characters.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('n') => bytes.push(b'\n'),
            Some('r') => bytes.push(b'\r'),
            Some('t') => bytes.push(b'\t'),
            Some('v') => bytes.push(0x0b),
            Some(digit @ '0'..='7') => {
                let mut octal = String::from(digit);
                while octal.len() < 3 {
                    match chars.peek() {
                        Some(next @ '0'..='7') => {
                            octal.push(*next);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                // Out of byte range: keep the escape as written
                match u8::from_str_radix(&octal, 8) {
                    Ok(byte) => bytes.push(byte),
                    Err(_) => {
                        bytes.push(b'\\');
                        bytes.extend_from_slice(octal.as_bytes());
                    }
                }
            }
            Some(other) => {
                let mut buf = [0; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
