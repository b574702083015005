use std::cell::RefCell;
use std::ffi::OsString;
use std::path::Path;
use std::rc::Rc;

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asc_api::{create_scheduler, load_config, run_until_idle, CreateSchedulerOptions};
use asc_core::{SchedulerConfig, ScriptError};
use asc_registry::{RegistryEntry, ScriptRegistry};

mod cli_args;
mod error_map;
mod event_printer;
mod source_loader;

pub(crate) use cli_args::{Cli, ListArgs, Mode, RunArgs};
pub(crate) use error_map::{emit_error, map_cli_output};
pub(crate) use event_printer::EventPrinter;
pub(crate) use source_loader::resolve_scripts_dir;

/// Logs go to stderr so stdout stays line-oriented. `RUST_LOG` overrides the
/// default `warn` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ScriptError> {
    match cli.command {
        Mode::List(args) => run_list(args),
        Mode::Run(args) => run_script(args),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptListing {
    name: String,
    display_name: String,
    category: String,
    path: String,
    lines: usize,
    preview: String,
}

impl ScriptListing {
    fn from_entry(entry: &RegistryEntry, preview_lines: usize) -> Self {
        Self {
            name: entry.name().to_string(),
            display_name: entry.display_name(),
            category: entry.category().to_string(),
            path: entry.path().to_string_lossy().replace('\\', "/"),
            lines: entry.body().len(),
            preview: entry.preview(preview_lines),
        }
    }
}

fn run_list(args: ListArgs) -> Result<i32, ScriptError> {
    let scripts_dir = resolve_scripts_dir(&args.scripts_dir)?;
    let mut registry = ScriptRegistry::new(args.extension);
    registry.discover(&scripts_dir)?;

    for entry in registry.entries() {
        let listing = ScriptListing::from_entry(entry, args.preview_lines);
        println!(
            "SCRIPT:{}",
            serde_json::to_string(&listing).map_err(map_cli_output)?
        );
    }
    println!("RESULT:OK");
    Ok(0)
}

fn run_script(args: RunArgs) -> Result<i32, ScriptError> {
    let scripts_dir = resolve_scripts_dir(&args.scripts_dir)?;
    let config = match args.config.as_deref() {
        Some(path) => load_config(Path::new(path))?,
        None => SchedulerConfig::default(),
    };

    let printer = Rc::new(RefCell::new(EventPrinter::default()));
    let mut created = create_scheduler(CreateSchedulerOptions {
        config,
        scripts_dir: Some(scripts_dir),
        notifications: Some(Box::new(Rc::clone(&printer))),
        ..CreateSchedulerOptions::default()
    })?;

    let (name, body) = {
        let registry = created.registry.borrow();
        let entry = registry.find(&args.script).ok_or_else(|| {
            ScriptError::new(
                "CLI_SCRIPT_NOT_FOUND",
                format!("No script matches \"{}\".", args.script),
            )
        })?;
        (entry.name().to_string(), entry.body().clone())
    };

    info!(script = %name, highlight = args.highlight, "running script");
    created
        .scheduler
        .play_with_highlight(&name, body, args.highlight)?;
    let summary = run_until_idle(&mut created.scheduler, args.max_ticks, args.realtime)?;

    if let Some(failure) = printer.borrow_mut().failure.take() {
        return Err(failure);
    }
    println!("TICKS:{}", summary.ticks);
    println!("RESULT:OK");
    Ok(0)
}
