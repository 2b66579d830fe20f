//! Init command implementation.
//!
//! Writes a default `sheetsmith.yaml` and reports how many sprite images
//! the default rule already finds.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::config::{SpriteConfig, DEFAULT_PATTERN, MANIFEST_FILENAME};
use crate::discovery::discover_project;
use crate::error::{Result, SpriteError};
use crate::output::{display_path, plural, Printer};

/// Initialize a project by generating a sheetsmith.yaml manifest
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing sheetsmith.yaml
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, printer: &Printer) -> Result<()> {
    let manifest_path = args.path.join(MANIFEST_FILENAME);

    if manifest_path.exists() && !args.force {
        return Err(SpriteError::Config {
            message: format!("{} already exists", MANIFEST_FILENAME),
            help: Some("Use --force to overwrite".to_string()),
        });
    }

    printer.status("Scanning", &display_path(&args.path));
    let mut defaults = SpriteConfig::default();
    defaults.output.public_dir = args.path.join(&defaults.output.public_dir);
    defaults.root = args.path.clone();
    let found = discover_project(&defaults)?.total_images();

    fs::write(&manifest_path, template()).map_err(|e| SpriteError::Io {
        path: manifest_path.clone(),
        message: format!("Failed to write manifest: {}", e),
    })?;

    printer.success(
        "Created",
        &format!(
            "{} ({} found)",
            MANIFEST_FILENAME,
            plural(found, "sprite image", "sprite images")
        ),
    );

    Ok(())
}

// Built by hand to keep comments and a stable key order.
fn template() -> String {
    let mut yaml = String::new();
    yaml.push_str("# Paths are relative to this file.\n");
    yaml.push_str("root: .\n");
    yaml.push_str("public: public\n");
    yaml.push_str("\n# Sheet name -> pattern over root-relative image paths.\n");
    yaml.push_str("sheets:\n");
    yaml.push_str(&format!("  default: '{}'\n", DEFAULT_PATTERN));
    yaml.push_str("\noutput_dir: images/spritesheets\n");
    yaml.push_str("output_file: '{{name}}.png'\n");
    yaml.push_str("default_sheet: default\n");
    yaml.push_str("\npacking:\n");
    yaml.push_str("  algorithm: binary-tree\n");
    yaml.push_str("  padding: 0\n");
    yaml
}
