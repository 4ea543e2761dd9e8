use std::env;
use std::path::{Component, Path, PathBuf};

/// Canonical form of `path` for messages, falling back to a lexically
/// normalized absolute path when the path does not exist.
pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => absolute_normalized(path).display().to_string(),
    }
}

/// Makes `path` absolute against the current directory and resolves `.` and
/// `..` lexically. Symlinks are left alone.
pub fn absolute_normalized(path: &Path) -> PathBuf {
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(current_dir) => current_dir.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_path(&absolute_path)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty() && !matches!(components.last(), Some(Component::RootDir))
                {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Shortens paths inside `home` to `~/...`.
pub fn home_relative_display(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| path.strip_prefix(home).ok()) {
        Some(relative) if !relative.as_os_str().is_empty() => {
            format!("~{}{}", std::path::MAIN_SEPARATOR, relative.display())
        }
        _ => path.display().to_string(),
    }
}

pub trait PathExt {
    fn best_effort_path_display(&self) -> String;

    /// Display name for a project root, relative to `$HOME` when possible.
    fn project_display(&self) -> String;

    /// True when `self` lies somewhere below `ancestor` (never equal to it).
    fn is_strictly_inside(&self, ancestor: &Path) -> bool;
}

impl PathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn project_display(&self) -> String {
        let home = env::var_os("HOME").map(PathBuf::from);
        home_relative_display(self, home.as_deref())
    }

    fn is_strictly_inside(&self, ancestor: &Path) -> bool {
        self != ancestor && self.starts_with(ancestor)
    }
}

impl PathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }

    fn project_display(&self) -> String {
        self.as_path().project_display()
    }

    fn is_strictly_inside(&self, ancestor: &Path) -> bool {
        self.as_path().is_strictly_inside(ancestor)
    }
}
