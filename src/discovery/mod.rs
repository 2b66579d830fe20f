//! Sprite image discovery.
//!
//! Walks the project tree and groups every regular file into the sheets
//! whose pattern matches its root-relative path.
//!
//! # Example
//!
//! ```ignore
//! use sheetsmith::discovery::discover_project;
//!
//! let set = discover_project(&config)?;
//! for (sheet, images) in set.iter() {
//!     println!("{sheet}: {} images", images.len());
//! }
//! ```

mod prune;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{SheetRegistry, SpriteConfig};
use crate::error::{Result, SpriteError};

/// Sheet name to the absolute paths of its images, in traversal order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiscoveredSet {
    sheets: BTreeMap<String, Vec<PathBuf>>,
}

impl DiscoveredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images matched for a sheet.
    pub fn images(&self, sheet: &str) -> Option<&[PathBuf]> {
        self.sheets.get(sheet).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.sheets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(|s| s.as_str())
    }

    /// Number of sheets with at least one image.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Total image count across sheets (a file in two sheets counts twice).
    pub fn total_images(&self) -> usize {
        self.sheets.values().map(|v| v.len()).sum()
    }

    fn push(&mut self, sheet: &str, path: PathBuf) {
        self.sheets.entry(sheet.to_string()).or_default().push(path);
    }
}

impl IntoIterator for DiscoveredSet {
    type Item = (String, Vec<PathBuf>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<PathBuf>>;

    fn into_iter(self) -> Self::IntoIter {
        self.sheets.into_iter()
    }
}

pub use prune::Pruning;

/// Discover the images of a project, leaving out its own sheet output.
pub fn discover_project(config: &SpriteConfig) -> Result<DiscoveredSet> {
    discover(&config.root, &config.registry, &config.pruning())
}

/// Walk `root` and collect the images of every sheet in `registry`.
///
/// Directories skipped by `pruning` are never entered. Traversal is sorted
/// by file name, so the order of images within a sheet is stable for an
/// unchanged tree.
pub fn discover(root: &Path, registry: &SheetRegistry, pruning: &Pruning) -> Result<DiscoveredSet> {
    let root = root.canonicalize().map_err(|e| SpriteError::Discovery {
        root: root.to_path_buf(),
        message: e.to_string(),
    })?;

    if !root.is_dir() {
        return Err(SpriteError::Discovery {
            root,
            message: "not a directory".to_string(),
        });
    }

    // Surface an unreadable root as an error rather than an empty set.
    std::fs::read_dir(&root).map_err(|e| SpriteError::Discovery {
        root: root.clone(),
        message: e.to_string(),
    })?;

    let mut set = DiscoveredSet::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !pruning.skips(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(relative) = relative_key(&root, path) else {
            continue;
        };

        for rule in registry.matching(&relative) {
            debug!(sheet = rule.name(), path = %relative, "matched sprite image");
            set.push(rule.name(), path.to_path_buf());
        }
    }

    debug!(
        root = %root.display(),
        sheets = set.len(),
        images = set.total_images(),
        "discovery finished"
    );

    Ok(set)
}

/// Root-relative path joined with `/`, the form sheet patterns match against.
pub(crate) fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}
