pub mod build;
pub mod completions;
pub mod init;
pub mod list;
pub mod lookup;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SpriteConfig;
use crate::error::{Result, SpriteError};

/// sheetsmith - Sprite sheet generator for stylesheet pipelines
#[derive(Parser, Debug)]
#[command(name = "sheetsmith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show debug logging (overridden by SHEETSMITH_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover sprite images and build every sheet
    Build(build::BuildArgs),

    /// List sheets and the images they would contain
    List(list::ListArgs),

    /// Build, then evaluate a stylesheet function or variable
    Lookup(lookup::LookupArgs),

    /// Initialize a project (generates sheetsmith.yaml)
    Init(init::InitArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Where to find the project configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Configuration file (default: ./sheetsmith.yaml if present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Override the discovery root
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn load(&self) -> Result<SpriteConfig> {
        let mut config = match &self.config {
            Some(path) => SpriteConfig::load(path)?,
            None => {
                let cwd = std::env::current_dir().map_err(|e| SpriteError::Io {
                    path: PathBuf::from("."),
                    message: format!("Failed to read current directory: {}", e),
                })?;
                SpriteConfig::locate(&cwd)?
            }
        };

        if let Some(root) = &self.root {
            config.root = root.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from(["sheetsmith", "build", "--json", "--root", "site", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Build(args) => {
                assert!(args.json);
                assert!(!args.watch);
                assert_eq!(args.project.root, Some(PathBuf::from("site")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_project_args_root_override() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("sheetsmith.yaml");
        fs::write(&manifest, "root: assets\n").unwrap();

        let args = ProjectArgs {
            config: Some(manifest),
            root: Some(PathBuf::from("/elsewhere")),
        };
        let config = args.load().unwrap();
        assert_eq!(config.root, PathBuf::from("/elsewhere"));
        assert_eq!(config.output.public_dir, dir.path().join("public"));
    }
}
