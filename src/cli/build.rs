//! Build command implementation.
//!
//! Runs one generation pass through a fresh coordinator and reports each
//! sheet. With `--watch`, keeps running and rebuilds whenever a sprite
//! source changes.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use clap::Args;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::ProjectArgs;
use crate::config::SpriteConfig;
use crate::coordinator::Coordinator;
use crate::discovery::{relative_key, Pruning};
use crate::error::{Result, SpriteError};
use crate::output::{display_path, plural, Printer};
use crate::sheet::ResultsTable;

/// Quiet period after a change before rebuilding.
const SETTLE: Duration = Duration::from_millis(200);

/// Discover sprite images and build every sheet
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print the results table as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Rebuild when sprite images change
    #[arg(long, short)]
    pub watch: bool,
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    let config = Arc::new(args.project.load()?);
    let runtime = new_runtime()?;

    build_once(&runtime, &config, args.json, printer)?;

    if args.watch {
        watch(&runtime, &config, args.json, printer)?;
    }

    Ok(())
}

pub(crate) fn new_runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| SpriteError::Interrupted {
        message: format!("failed to start async runtime: {}", e),
    })
}

/// Run a single generation pass and report it.
pub fn build_once(
    runtime: &Runtime,
    config: &Arc<SpriteConfig>,
    json: bool,
    printer: &Printer,
) -> Result<Arc<ResultsTable>> {
    if !config.enabled {
        printer.warning("Skipping", "sprite generation is disabled");
    } else {
        printer.status("Discovering", &display_path(&config.root));
    }

    let coordinator: Coordinator<()> = Coordinator::new(Arc::clone(config));
    let (_, bridge) = runtime.block_on(coordinator.acquire((), config.root.clone()))?;
    let results = Arc::clone(bridge.results());

    for sheet in results.iter() {
        printer.status(
            "Packed",
            &format!(
                "{} {} {}",
                printer.bold(&sheet.name),
                printer.dim(&format!(
                    "({}x{}, {})",
                    sheet.properties.width,
                    sheet.properties.height,
                    plural(sheet.coordinates.len(), "image", "images")
                )),
                printer.cyan(&display_path(&sheet.output_path))
            ),
        );
    }

    if config.enabled {
        printer.success("Finished", &plural(results.len(), "sprite sheet", "sprite sheets"));
    }

    if json {
        println!("{}", results.to_json()?);
    }

    Ok(results)
}

fn watch(runtime: &Runtime, config: &Arc<SpriteConfig>, json: bool, printer: &Printer) -> Result<()> {
    let root = config.root.canonicalize().map_err(|e| SpriteError::Io {
        path: config.root.clone(),
        message: format!("Failed to resolve root: {}", e),
    })?;

    let pruning = config.pruning();
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        Config::default(),
    )
    .map_err(|e| watch_error(&root, e))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| watch_error(&root, e))?;

    printer.info("Watching", &display_path(&root));

    while let Ok(res) = rx.recv() {
        let mut changed = match res {
            Ok(event) => sprite_changes(config, &pruning, &root, &event),
            Err(e) => {
                warn!(error = %e, "watch error");
                continue;
            }
        };
        if changed.is_empty() {
            continue;
        }

        // Let editors and copies finish before rebuilding.
        while let Ok(res) = rx.recv_timeout(SETTLE) {
            if let Ok(event) = res {
                changed.extend(sprite_changes(config, &pruning, &root, &event));
            }
        }

        debug!(paths = changed.len(), "sprite sources changed");
        printer.info("Changed", &plural(changed.len(), "file", "files"));

        // A failed rebuild is reported; the watch goes on.
        if let Err(e) = build_once(runtime, config, json, printer) {
            printer.error("Failed", &e.to_string());
        }
    }

    Ok(())
}

/// Paths in an event that discovery would pick up. Writes into the sheet
/// output directory never count, so a rebuild cannot trigger itself.
fn sprite_changes(config: &SpriteConfig, pruning: &Pruning, root: &Path, event: &Event) -> Vec<PathBuf> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| is_sprite_source(config, pruning, root, path))
        .cloned()
        .collect()
}

fn is_sprite_source(config: &SpriteConfig, pruning: &Pruning, root: &Path, path: &Path) -> bool {
    let Some(key) = relative_key(root, path) else {
        return false;
    };

    !pruning.covers(root, path) && config.registry.matching(&key).next().is_some()
}

fn watch_error(root: &Path, e: notify::Error) -> SpriteError {
    SpriteError::Io {
        path: root.to_path_buf(),
        message: format!("Failed to watch for changes: {}", e),
    }
}
