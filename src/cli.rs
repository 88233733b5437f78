// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `mpiwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mpiwatch",
    version,
    about = "Run a parallel MPI image-processing job and follow its progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Folder containing the input `.bmp` images.
    ///
    /// The job runs from this folder's parent, which must also contain the
    /// executable and the `machinefile`.
    #[arg(long, value_name = "DIR")]
    pub images: PathBuf,

    /// Blur kernel size (odd, 55..=150).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub kernel: i64,

    /// Path to a config file (TOML).
    ///
    /// Default: `Mpiwatch.toml` in the current directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of MPI worker processes (overrides `[launch].workers`).
    #[arg(long, value_name = "N")]
    pub workers: Option<u32>,

    /// Executable name (overrides `[launch].executable`).
    #[arg(long, value_name = "NAME")]
    pub executable: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MPIWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate input and print the launch command without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
