use clap::{Args, Parser, Subcommand};

use asc_core::DEFAULT_SCRIPT_EXTENSION;

#[derive(Debug, Parser)]
#[command(name = "asc-cli")]
#[command(about = "Tick-driven script runner")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    List(ListArgs),
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    #[arg(long = "extension", default_value = DEFAULT_SCRIPT_EXTENSION)]
    pub(crate) extension: String,
    #[arg(long = "preview-lines", default_value_t = 3)]
    pub(crate) preview_lines: usize,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    #[arg(long = "max-ticks", default_value_t = 10_000)]
    pub(crate) max_ticks: usize,
    #[arg(long = "highlight")]
    pub(crate) highlight: bool,
    /// Sleep the configured tick interval between ticks.
    #[arg(long = "realtime")]
    pub(crate) realtime: bool,
}
