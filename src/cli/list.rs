//! List command implementation.
//!
//! Runs discovery only and prints what each sheet would contain.

use clap::Args;

use super::ProjectArgs;
use crate::discovery::{discover_project, DiscoveredSet};
use crate::error::Result;
use crate::output::{display_path, plural, Printer};

/// List sheets and the images they would contain
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Show every image path
    #[arg(long)]
    pub files: bool,
}

pub fn run(args: ListArgs, printer: &Printer) -> Result<()> {
    let config = args.project.load()?;
    let discovered = discover_project(&config)?;

    print_inventory(&discovered, args.files, printer);

    let empty: Vec<&str> = config
        .registry
        .names()
        .filter(|name| discovered.images(name).is_none())
        .collect();
    if !empty.is_empty() {
        printer.warning("Empty", &empty.join(", "));
    }

    Ok(())
}

fn print_inventory(discovered: &DiscoveredSet, files: bool, printer: &Printer) {
    for (sheet, images) in discovered.iter() {
        printer.info(sheet, &plural(images.len(), "image", "images"));
        if files {
            for image in images {
                println!("  {}", display_path(image));
            }
        }
    }
}
