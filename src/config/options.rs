//! Packing and output options.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Token replaced by the sheet name in output file templates.
pub const NAME_TOKEN: &str = "{{name}}";

/// Layout strategy used to place images on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Stack images vertically.
    TopDown,
    /// Line images up horizontally.
    LeftRight,
    /// Place images corner to corner, descending to the right.
    Diagonal,
    /// Place images corner to corner, descending to the left.
    AltDiagonal,
    /// Grow a binary tree of free regions around the largest images first.
    #[default]
    BinaryTree,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::TopDown,
        Algorithm::LeftRight,
        Algorithm::Diagonal,
        Algorithm::AltDiagonal,
        Algorithm::BinaryTree,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::TopDown => "top-down",
            Algorithm::LeftRight => "left-right",
            Algorithm::Diagonal => "diagonal",
            Algorithm::AltDiagonal => "alt-diagonal",
            Algorithm::BinaryTree => "binary-tree",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown algorithm '{}' (expected one of: top-down, left-right, diagonal, alt-diagonal, binary-tree)",
                    s
                )
            })
    }
}

/// Encoding of the packed sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Options handed to the packing engine for one sheet.
///
/// Format, quality and timeout are independent engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    pub algorithm: Algorithm,
    /// Pixels left between neighbouring images.
    pub padding: u32,
    pub format: OutputFormat,
    /// Encoder quality (1-100); only lossy formats use it.
    pub quality: u8,
    pub timeout_ms: u64,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            padding: 0,
            format: OutputFormat::default(),
            quality: 75,
            timeout_ms: 10_000,
        }
    }
}

impl PackOptions {
    /// Apply a per-sheet override on top of these options.
    pub fn with_override(&self, over: &PackOverride) -> Self {
        Self {
            algorithm: over.algorithm.unwrap_or(self.algorithm),
            padding: over.padding.unwrap_or(self.padding),
            format: over.format.unwrap_or(self.format),
            quality: over.quality.unwrap_or(self.quality),
            timeout_ms: over.timeout_ms.unwrap_or(self.timeout_ms),
        }
    }

    pub(crate) fn validate(&self, context: &str) -> Result<(), String> {
        if !(1..=100).contains(&self.quality) {
            return Err(format!(
                "{}: quality must be between 1 and 100, got {}",
                context, self.quality
            ));
        }
        if self.timeout_ms == 0 {
            return Err(format!("{}: timeout_ms must be greater than 0", context));
        }
        Ok(())
    }
}

/// Per-sheet packing settings; unset fields inherit the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Where packed sheets are written and how they are addressed on the web.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutput {
    /// Public (served) directory on disk.
    pub public_dir: PathBuf,
    /// Directory below `public_dir`, also the URL prefix.
    pub output_dir: String,
    /// File name template; `{{name}}` is replaced by the sheet name.
    pub output_file: String,
}

impl SheetOutput {
    pub fn file_name(&self, sheet: &str) -> String {
        self.output_file.replace(NAME_TOKEN, sheet)
    }

    /// Web-facing URL of a sheet, independent of its on-disk location.
    pub fn url(&self, sheet: &str) -> String {
        let dir = self.output_dir.trim_matches('/');
        if dir.is_empty() {
            format!("/{}", self.file_name(sheet))
        } else {
            format!("/{}/{}", dir, self.file_name(sheet))
        }
    }

    pub fn directory(&self) -> PathBuf {
        self.public_dir.join(Path::new(self.output_dir.trim_matches('/')))
    }

    pub fn path(&self, sheet: &str) -> PathBuf {
        self.directory().join(self.file_name(sheet))
    }
}
