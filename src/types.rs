use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use crate::errors::{MpiwatchError, Result, RunError};

/// Weight of a single classified output line. Zero means "not progress".
pub type EventWeight = u32;

/// Default number of MPI worker processes.
pub const DEFAULT_WORKERS: u32 = 19;

/// Immutable configuration for one run.
///
/// Construct through [`RunRequest::new`], which rejects requests the
/// estimator cannot work with (zero expected events, zero workers) and
/// working directories that do not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    working_dir: PathBuf,
    kernel: i64,
    executable: String,
    workers: u32,
    expected_total: NonZeroU64,
}

impl RunRequest {
    pub fn new(
        working_dir: impl Into<PathBuf>,
        kernel: i64,
        executable: impl Into<String>,
        workers: u32,
        expected_total: u64,
    ) -> Result<Self> {
        let working_dir = working_dir.into();
        if !working_dir.is_dir() {
            return Err(MpiwatchError::InvalidRequest(format!(
                "working directory {:?} does not exist or is not a directory",
                working_dir
            )));
        }

        let executable = executable.into();
        if executable.trim().is_empty() {
            return Err(MpiwatchError::InvalidRequest(
                "executable name must not be empty".to_string(),
            ));
        }

        if workers == 0 {
            return Err(MpiwatchError::InvalidRequest(
                "worker count must be >= 1 (got 0)".to_string(),
            ));
        }

        let expected_total = NonZeroU64::new(expected_total).ok_or_else(|| {
            MpiwatchError::InvalidRequest(
                "expected total event count must be >= 1 (got 0)".to_string(),
            )
        })?;

        Ok(Self {
            working_dir,
            kernel,
            executable,
            workers,
            expected_total,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn kernel(&self) -> i64 {
        self.kernel
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    pub fn expected_total(&self) -> NonZeroU64 {
        self.expected_total
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Process exited with status 0.
    Succeeded,
    /// Process exited with a non-zero status (or was killed by a signal, -1).
    Failed(i32),
    /// `stop()` was requested and the process was killed.
    Stopped,
    /// The process could not be spawned at all.
    LaunchFailed,
}

/// Terminal result of a run, built once when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Verbatim content of the results artifact, if it was read.
    pub artifact: Option<String>,
    /// Structured form of the failure surfaced to the observer, if any.
    pub error: Option<RunError>,
    /// Total event weight observed during the run.
    pub events: u64,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded && self.error.is_none()
    }
}
