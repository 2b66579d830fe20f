//! Project configuration (`sheetsmith.yaml`).
//!
//! The manifest is the raw, serde-facing form of the configuration. It is
//! validated once into a [`SpriteConfig`], which is what the rest of the
//! pipeline consumes.
//!
//! # Example
//!
//! ```yaml
//! root: .
//! public: public
//! sheets:
//!   default: '^app/assets/images/sprites/(.*)\.png$'
//!   icons: '^app/assets/images/icons/.*\.png$'
//! output_dir: images/spritesheets
//! output_file: '{{name}}.png'
//! packing:
//!   algorithm: binary-tree
//!   padding: 2
//!   overrides:
//!     icons: { algorithm: top-down }
//! ```

mod options;
mod registry;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::Pruning;
use crate::error::{Result, SpriteError};

pub use options::{Algorithm, OutputFormat, PackOptions, PackOverride, SheetOutput, NAME_TOKEN};
pub use registry::{SheetRegistry, SheetRule, DEFAULT_PATTERN, DEFAULT_SHEET};

/// The name of the configuration file.
pub const MANIFEST_FILENAME: &str = "sheetsmith.yaml";

/// Directories skipped during discovery unless configured otherwise.
pub const DEFAULT_IGNORED_DIRS: [&str; 4] = [".git", "node_modules", "bower_components", "vendor"];

/// Raw configuration as written in `sheetsmith.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Whether sprite generation runs at all.
    pub enabled: bool,

    /// Project root walked for sprite images.
    pub root: PathBuf,

    /// Public directory sheets are written into.
    pub public: PathBuf,

    /// Sheet name to path pattern.
    pub sheets: BTreeMap<String, String>,

    /// Output directory below `public`, also used as the URL prefix.
    pub output_dir: String,

    /// Output file name template.
    pub output_file: String,

    /// Sheet used when a lookup names none.
    pub default_sheet: String,

    /// Register the bundled mixins with the stylesheet compiler.
    pub include_mixins: bool,

    /// Sprites `@extend` a sheet placeholder instead of mixing in properties.
    pub use_extend_directive: bool,

    /// Directory names never descended into.
    pub ignored_dirs: Vec<String>,

    pub packing: PackingManifest,
}

/// The `packing:` section: defaults plus per-sheet overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingManifest {
    #[serde(flatten)]
    pub defaults: PackOptions,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, PackOverride>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("."),
            public: PathBuf::from("public"),
            sheets: BTreeMap::from([(DEFAULT_SHEET.to_string(), DEFAULT_PATTERN.to_string())]),
            output_dir: "images/spritesheets".to_string(),
            output_file: format!("{}.png", NAME_TOKEN),
            default_sheet: DEFAULT_SHEET.to_string(),
            include_mixins: true,
            use_extend_directive: false,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            packing: PackingManifest::default(),
        }
    }
}

impl Manifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SpriteError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read configuration: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse a manifest from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| SpriteError::Config {
            message: format!("Invalid configuration: {}", e),
            help: Some(format!("Check {} syntax", MANIFEST_FILENAME)),
        })
    }

    /// Render the manifest back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| SpriteError::config(format!(
            "Failed to serialize configuration: {}",
            e
        )))
    }
}

/// Validated pipeline configuration.
#[derive(Debug, Clone)]
pub struct SpriteConfig {
    pub enabled: bool,
    pub root: PathBuf,
    pub registry: SheetRegistry,
    pub output: SheetOutput,
    pub default_sheet: String,
    pub include_mixins: bool,
    pub use_extend_directive: bool,
    pub ignored_dirs: Vec<String>,
    pub packing: PackOptions,
    pub overrides: BTreeMap<String, PackOverride>,
}

impl SpriteConfig {
    /// Validate a manifest.
    ///
    /// Relative `root` and `public` paths are kept as written; use
    /// [`SpriteConfig::load`] to resolve them against the manifest location.
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let registry = SheetRegistry::from_patterns(
            manifest
                .sheets
                .iter()
                .map(|(name, pattern)| (name.as_str(), pattern.as_str())),
        )?;

        if manifest.default_sheet.trim().is_empty() {
            return Err(SpriteError::config("default_sheet must not be empty"));
        }

        if manifest.output_file.trim().is_empty() {
            return Err(SpriteError::config("output_file must not be empty"));
        }

        let escapes = Path::new(&manifest.output_file)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(SpriteError::Config {
                message: format!("output_file \"{}\" must stay inside output_dir", manifest.output_file),
                help: Some("Use output_dir to choose the directory sheets are written to".to_string()),
            });
        }

        if registry.len() > 1 && !manifest.output_file.contains(NAME_TOKEN) {
            return Err(SpriteError::Config {
                message: format!(
                    "output_file \"{}\" would be shared by {} sheets",
                    manifest.output_file,
                    registry.len()
                ),
                help: Some(format!("Include {} in output_file", NAME_TOKEN)),
            });
        }

        if Path::new(&manifest.output_dir).is_absolute() {
            return Err(SpriteError::Config {
                message: format!("output_dir \"{}\" must be relative", manifest.output_dir),
                help: Some("output_dir is resolved against the public directory and used as a URL prefix".to_string()),
            });
        }

        let defaults = manifest.packing.defaults;
        defaults.validate("packing").map_err(SpriteError::config)?;

        for (sheet, over) in &manifest.packing.overrides {
            if registry.get(sheet).is_none() {
                return Err(SpriteError::config(format!(
                    "packing override for unknown sheet \"{}\"",
                    sheet
                )));
            }
            defaults
                .with_override(over)
                .validate(&format!("packing.overrides.{}", sheet))
                .map_err(SpriteError::config)?;
        }

        Ok(Self {
            enabled: manifest.enabled,
            root: manifest.root,
            registry,
            output: SheetOutput {
                public_dir: manifest.public,
                output_dir: manifest.output_dir,
                output_file: manifest.output_file,
            },
            default_sheet: manifest.default_sheet,
            include_mixins: manifest.include_mixins,
            use_extend_directive: manifest.use_extend_directive,
            ignored_dirs: manifest.ignored_dirs,
            packing: defaults,
            overrides: manifest.packing.overrides,
        })
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_manifest(Manifest::load(path)?)?;
        if let Some(base) = path.parent() {
            config.root = base.join(&config.root);
            config.output.public_dir = base.join(&config.output.public_dir);
        }
        Ok(config)
    }

    /// Load `sheetsmith.yaml` from a directory, or use defaults rooted there.
    pub fn locate(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILENAME);
        if manifest_path.is_file() {
            Self::load(&manifest_path)
        } else {
            let mut config = Self::default();
            config.root = dir.to_path_buf();
            config.output.public_dir = dir.join(&config.output.public_dir);
            Ok(config)
        }
    }

    /// Effective packing options for a sheet.
    pub fn pack_options(&self, sheet: &str) -> PackOptions {
        match self.overrides.get(sheet) {
            Some(over) => self.packing.with_override(over),
            None => self.packing.clone(),
        }
    }

    /// What discovery and watching skip: ignored directory names and the
    /// directory sheets are written to.
    pub fn pruning(&self) -> Pruning {
        Pruning::new(&self.ignored_dirs).excluding(&self.output.directory())
    }
}

impl Default for SpriteConfig {
    fn default() -> Self {
        let manifest = Manifest::default();
        Self {
            enabled: manifest.enabled,
            root: manifest.root,
            registry: SheetRegistry::default(),
            output: SheetOutput {
                public_dir: manifest.public,
                output_dir: manifest.output_dir,
                output_file: manifest.output_file,
            },
            default_sheet: manifest.default_sheet,
            include_mixins: manifest.include_mixins,
            use_extend_directive: manifest.use_extend_directive,
            ignored_dirs: manifest.ignored_dirs,
            packing: manifest.packing.defaults,
            overrides: manifest.packing.overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = Manifest::parse("output_dir: sprites").unwrap();

        assert_eq!(manifest.output_dir, "sprites");
        assert!(manifest.enabled);
        assert_eq!(manifest.default_sheet, "default");
        assert_eq!(manifest.sheets.len(), 1);
        assert_eq!(manifest.ignored_dirs, DEFAULT_IGNORED_DIRS.to_vec());
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
enabled: true
root: site
public: site/public
sheets:
  icons: '^icons/.*\.png$'
  ui: '^ui/.*\.png$'
output_dir: img/sheets
output_file: 'sheet-{{name}}.png'
default_sheet: icons
include_mixins: false
use_extend_directive: true
ignored_dirs: [.git, target]
packing:
  algorithm: top-down
  padding: 4
  format: jpg
  quality: 90
  timeout_ms: 500
  overrides:
    ui:
      algorithm: left-right
      padding: 0
"#;
        let config = SpriteConfig::from_manifest(Manifest::parse(yaml).unwrap()).unwrap();

        assert_eq!(config.root, PathBuf::from("site"));
        assert_eq!(config.output.public_dir, PathBuf::from("site/public"));
        assert_eq!(config.registry.names().collect::<Vec<_>>(), vec!["icons", "ui"]);
        assert_eq!(config.default_sheet, "icons");
        assert!(!config.include_mixins);
        assert!(config.use_extend_directive);
        assert!(config.pruning().is_ignored_name("target"));
        assert!(!config.pruning().is_ignored_name("node_modules"));
        assert_eq!(config.output.url("ui"), "/img/sheets/sheet-ui.png");

        let icons = config.pack_options("icons");
        assert_eq!(icons.algorithm, Algorithm::TopDown);
        assert_eq!(icons.padding, 4);
        assert_eq!(icons.format, OutputFormat::Jpeg);
        assert_eq!(icons.quality, 90);
        assert_eq!(icons.timeout_ms, 500);

        let ui = config.pack_options("ui");
        assert_eq!(ui.algorithm, Algorithm::LeftRight);
        assert_eq!(ui.padding, 0);
        assert_eq!(ui.quality, 90);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Manifest::parse("outputDir: sprites").unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_shared_output_file_rejected() {
        let mut manifest = Manifest::default();
        manifest.sheets.insert("icons".to_string(), "^icons/".to_string());
        manifest.output_file = "sprites.png".to_string();

        let err = SpriteConfig::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("would be shared by 2 sheets"));
    }

    #[test]
    fn test_override_for_unknown_sheet_rejected() {
        let mut manifest = Manifest::default();
        manifest
            .packing
            .overrides
            .insert("nope".to_string(), PackOverride::default());

        let err = SpriteConfig::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("unknown sheet \"nope\""));
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let manifest = Manifest::parse("packing:\n  quality: 0\n").unwrap();
        assert!(SpriteConfig::from_manifest(manifest).is_err());
    }

    #[test]
    fn test_absolute_output_dir_rejected() {
        let manifest = Manifest {
            output_dir: "/abs/sheets".to_string(),
            ..Default::default()
        };
        assert!(SpriteConfig::from_manifest(manifest).is_err());
    }

    #[test]
    fn test_default_config_matches_default_manifest() {
        let config = SpriteConfig::default();
        let from_manifest = SpriteConfig::from_manifest(Manifest::default()).unwrap();

        assert_eq!(config.default_sheet, from_manifest.default_sheet);
        assert_eq!(config.output, from_manifest.output);
        assert_eq!(config.packing, from_manifest.packing);
        assert_eq!(
            config.registry.names().collect::<Vec<_>>(),
            from_manifest.registry.names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_load_resolves_paths_against_manifest_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILENAME), "root: src\npublic: dist\n").unwrap();

        let config = SpriteConfig::locate(dir.path()).unwrap();

        assert_eq!(config.root, dir.path().join("src"));
        assert_eq!(config.output.public_dir, dir.path().join("dist"));
    }

    #[test]
    fn test_locate_without_manifest_uses_defaults() {
        let dir = tempdir().unwrap();

        let config = SpriteConfig::locate(dir.path()).unwrap();

        assert_eq!(config.root, dir.path().to_path_buf());
        assert_eq!(config.output.public_dir, dir.path().join("public"));
        assert_eq!(config.default_sheet, "default");
    }

    #[test]
    fn test_manifest_yaml_roundtrip_is_valid() {
        let yaml = Manifest::default().to_yaml().unwrap();
        let parsed = Manifest::parse(&yaml).unwrap();
        assert!(SpriteConfig::from_manifest(parsed).is_ok());
    }

    #[test]
    fn test_sheet_names_stay_inside_output_dir() {
        let mut manifest = Manifest::default();
        manifest.sheets.insert("../../escape".to_string(), r"\.png$".to_string());
        let err = SpriteConfig::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("not a valid file name"));

        let manifest = Manifest::parse("output_file: '../{{name}}.png'").unwrap();
        let err = SpriteConfig::from_manifest(manifest).unwrap_err();
        assert!(err.to_string().contains("must stay inside output_dir"));

        let manifest = Manifest::parse("output_file: '{{name}}/sheet.png'").unwrap();
        assert!(SpriteConfig::from_manifest(manifest).is_ok());
    }
}
