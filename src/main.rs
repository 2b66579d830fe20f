use clap::Parser;
use miette::Result;
use sheetsmith::cli::{Cli, Commands};
use sheetsmith::output::Printer;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter (e.g. `sheetsmith=debug`).
const LOG_ENV: &str = "SHEETSMITH_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let printer = Printer::new();

    match cli.command {
        Commands::Build(args) => sheetsmith::cli::build::run(args, &printer)?,
        Commands::List(args) => sheetsmith::cli::list::run(args, &printer)?,
        Commands::Lookup(args) => sheetsmith::cli::lookup::run(args, &printer)?,
        Commands::Init(args) => sheetsmith::cli::init::run(args, &printer)?,
        Commands::Completions(args) => sheetsmith::cli::completions::run(args)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
