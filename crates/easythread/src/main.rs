//! easythread - move annotated functions into Web Workers
//!
//! CLI driver for transforming JavaScript and TypeScript modules.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::ProjectConfig;

/// Move annotated functions into Web Workers
#[derive(Parser, Debug)]
#[command(name = "easythread")]
#[command(author, version, about = "Move `// @easythread` functions into Web Workers")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (default: ./easythread.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform a file or directory tree
    Transform(commands::transform::TransformArgs),

    /// Report annotated declarations without writing anything
    Check(commands::check::CheckArgs),

    /// Write a default easythread.toml
    Init(commands::init::InitArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// Options shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub use_color: bool,
    pub quiet: bool,
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    let output = Output {
        format: cli.format,
        use_color: !cli.no_color && atty::is(atty::Stream::Stdout),
        quiet: cli.quiet,
    };

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Transform(args) => {
            let config = ProjectConfig::discover(cli.config.as_deref())?;
            commands::transform::run(args, config, output)
        }
        Commands::Check(args) => {
            let config = ProjectConfig::discover(cli.config.as_deref())?;
            commands::check::run(args, config, output)
        }
        Commands::Init(args) => commands::init::run(args, output),
        Commands::Explain(args) => commands::explain::run(args, output),
    }
}
