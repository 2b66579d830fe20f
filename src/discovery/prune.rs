//! Which parts of the project tree discovery and watching skip.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use walkdir::DirEntry;

/// Directories left out of discovery: any directory whose name is ignored,
/// plus specific directories such as the sheet output directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pruning {
    ignored_dirs: Vec<String>,
    excluded: Vec<PathBuf>,
}

impl Pruning {
    pub fn new(ignored_dirs: &[String]) -> Self {
        Self {
            ignored_dirs: ignored_dirs.to_vec(),
            excluded: Vec::new(),
        }
    }

    /// Also skip `dir` and everything below it. The directory need not exist.
    pub fn excluding(mut self, dir: &Path) -> Self {
        self.excluded.push(resolve(dir));
        self
    }

    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }

    /// Whether the walk should skip this entry and everything below it.
    ///
    /// The walk root itself is never skipped.
    pub(crate) fn skips(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }

        let ignored = entry
            .file_name()
            .to_str()
            .is_some_and(|name| self.is_ignored_name(name));
        ignored || self.excluded.iter().any(|dir| dir == entry.path())
    }

    /// Whether `path`, somewhere below `root`, lies in a skipped directory.
    ///
    /// Paths outside `root` are never covered. Excluded directories that
    /// contain `root` itself are disregarded.
    pub fn covers(&self, root: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };

        let in_ignored_dir = relative.parent().is_some_and(|dirs| {
            dirs.components().any(|c| match c {
                Component::Normal(name) => name.to_str().is_some_and(|n| self.is_ignored_name(n)),
                _ => false,
            })
        });

        in_ignored_dir
            || self
                .excluded
                .iter()
                .any(|dir| dir != root && dir.starts_with(root) && path.starts_with(dir))
    }
}

/// Absolute, symlink-free form of a path that may not exist yet: the
/// longest existing ancestor is canonicalized and the rest appended.
fn resolve(dir: &Path) -> PathBuf {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir.to_path_buf(),
        }
    };

    let mut missing: Vec<OsString> = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
