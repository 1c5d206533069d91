mod archive;
mod commands;
mod config;
mod diagnostics;
mod error;
mod fetch;
mod grammar;
mod plugin;
mod rbs_inline;
mod rbs_signatures;
mod resolver;
mod scanner;
mod sorbet_rbi;
mod stripper;
mod structure;
mod types;

use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "skillgen", about = "Build agent skill plugins with local copies of referenced code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file [default: .skillgen.toml, optional]
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[allow(clippy::arbitrary_source_item_ordering, reason = "field order is positional argument order")]
#[derive(Subcommand)]
enum Commands {
    /// Clean OUTPUT, copy SOURCE into it, and resolve references
    Generate {
        /// Skills tree to copy
        source: PathBuf,
        /// Plugin directory to (re)create
        output: PathBuf,
    },
    /// Download RBS core and stdlib signatures
    Rbs {
        /// Destination directory (replaced)
        dest: PathBuf,
    },
    /// Download Ruby sources of gems using rbs-inline annotations
    RbsInline {
        /// Destination directory
        dest: PathBuf,
    },
    /// Resolve blob references in markdown files in place
    Resolve {
        /// Directory to scan
        dir: PathBuf,
    },
    /// Download RBI files of gems shipping Sorbet types
    SorbetRbi {
        /// Destination directory
        dest: PathBuf,
    },
    /// Remove comment lines from signature files
    StripComments {
        /// Directory to scan
        dir: PathBuf,
        /// File extension to process
        #[arg(long, default_value = "rbs")]
        extension: String,
    },
}

/// Send `tracing` output to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = run(cli);
    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Load the config and dispatch to the selected command.
///
/// # Errors
///
/// Returns config errors or the command's own error.
fn run(cli: Cli) -> Result<(), error::Error> {
    let config = match &cli.config {
        Some(path) => Config::load(path, true)?,
        None => Config::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
    };

    return match cli.command {
        Commands::Generate { output, source } => commands::generate(&config, &source, &output),
        Commands::Rbs { dest } => commands::rbs(&config, &dest),
        Commands::RbsInline { dest } => commands::rbs_inline(&config, &dest),
        Commands::Resolve { dir } => commands::resolve(&config, &dir),
        Commands::SorbetRbi { dest } => commands::sorbet_rbi(&config, &dest),
        Commands::StripComments { dir, extension } => commands::strip_comments(&dir, &extension),
    };
}
