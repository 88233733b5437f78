// src/errors.rs

//! Crate-wide error types.
//!
//! - [`MpiwatchError`] covers everything that can go wrong *before* a run is
//!   started (config, request preparation, IO).
//! - [`RunError`] is the taxonomy of failures *during* a run. These never
//!   cross the `Supervisor::start` boundary once the process is running; they
//!   are rendered as output lines for the observer and kept on the final
//!   `RunOutcome`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MpiwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error("Invalid kernel size {0}: must be an odd number between 55 and 150")]
    InvalidKernel(i64),

    #[error("No BMP images found in {0:?}")]
    NoImages(PathBuf),

    #[error("Executable '{name}' not found or not executable in {dir:?}")]
    ExecutableNotFound { name: String, dir: PathBuf },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure kinds of a single run.
///
/// The `Display` text of each variant is exactly the line the supervisor
/// forwards to the observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("ERROR: could not execute '{program}' or '{machinefile}' was not found ({reason})")]
    Launch {
        program: String,
        machinefile: String,
        reason: String,
    },

    #[error("ERROR: the process exited with non-zero status {code}.")]
    NonZeroExit { code: i32 },

    #[error("Warning: {file} was not found in time.")]
    ArtifactTimeout { file: String, attempts: u32 },

    #[error("ERROR reading {file}: {reason}")]
    ArtifactRead { file: String, reason: String },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MpiwatchError>;
