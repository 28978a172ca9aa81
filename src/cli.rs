// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `shaperdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "shaperdag",
    version,
    about = "Run a dependency graph of table shapers with bounded concurrency.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline file (`.toml`, or `.json` for a bare step map).
    #[arg(long, value_name = "PATH", default_value = "Shaperdag.toml")]
    pub config: PathBuf,

    /// Source table (TSV) read by steps without dependencies.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Step whose output is wanted. Repeatable.
    #[arg(long = "target", value_name = "ID", required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Worker slots; overrides `[pool].workers`.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Copy each target's output here as `<id>.tsv`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SHAPERDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
