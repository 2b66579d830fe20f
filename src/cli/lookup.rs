//! Lookup command implementation.
//!
//! Builds the sheets, registers the sprite functions into an in-memory
//! table and evaluates one of them, the way a stylesheet would.

use std::sync::Arc;

use clap::Args;

use super::build::new_runtime;
use super::ProjectArgs;
use crate::bridge::{CallSite, FunctionTable, StyleValue};
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::output::Printer;

/// Build, then evaluate a stylesheet function or variable
#[derive(Args, Debug)]
pub struct LookupArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Function or variable name (e.g. sprite-image-x)
    pub function: String,

    /// Arguments; `null`, `true` and `false` are passed as literals
    pub args: Vec<String>,
}

pub fn run(args: LookupArgs, printer: &Printer) -> Result<()> {
    let config = Arc::new(args.project.load()?);
    let runtime = new_runtime()?;

    printer.status("Building", &format!("sprite sheets for {}", args.function));
    let coordinator: Coordinator<()> = Coordinator::new(config);
    let (_, bridge) = runtime.block_on(coordinator.acquire((), "<command line>"))?;

    let mut table = FunctionTable::new();
    bridge.register(&mut table);

    let values: Vec<StyleValue> = args.args.iter().map(|a| parse_value(a)).collect();
    let site = CallSite::new("<command line>", 1, 1);
    let result = table.evaluate(&args.function, &site, &values)?;

    println!("{}", result);
    Ok(())
}

fn parse_value(arg: &str) -> StyleValue {
    match arg {
        "null" => StyleValue::Null,
        "true" => StyleValue::Bool(true),
        "false" => StyleValue::Bool(false),
        other => StyleValue::from(other),
    }
}
