// src/supervisor/mod.rs

//! Process supervisor.
//!
//! A [`Supervisor`] launches one external MPI run per [`Supervisor::start`]
//! call and hands back a [`RunHandle`]. Each run gets:
//! - its own Tokio task (so blocking reads never stall the caller)
//! - a fresh [`Estimator`] and a copy of the classification table
//! - a oneshot cancel channel used by [`RunHandle::stop`]
//!
//! Nothing survives from one run to the next. Callers must not start a new
//! run against the same working directory before the previous one finished.
//!
//! ## Stop semantics
//!
//! `stop()` kills the process without a grace period. A stop that races with
//! the process exiting on its own may lose: if the run already moved past
//! the `Running` phase, the stop is ignored and the run completes normally
//! (artifact retrieval included). Output written by the process may be
//! truncated and the artifact may be missing or partial after a stop.

pub mod artifact;
pub mod observer;
mod run;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{MpiwatchError, Result, RunError};
use crate::exec::{LaunchCommand, LaunchSettings, ProcessBackend, TokioProcessBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::{Classifier, Estimator};
use crate::types::{RunOutcome, RunRequest};

pub use artifact::{ArtifactSettings, COST_REPORT, RESULTS_HEADER};
pub use observer::{ChannelObserver, RunEvent, RunObserver};
pub use run::RunPhase;

use run::{drive_run, RunContext};

/// Settings that apply to every run started by a supervisor.
#[derive(Debug, Clone, Default)]
pub struct SupervisorOptions {
    pub launch: LaunchSettings,
    pub artifact: ArtifactSettings,
    pub classifier: Classifier,
}

pub struct Supervisor<B: ProcessBackend> {
    backend: B,
    fs: Arc<dyn FileSystem>,
    options: SupervisorOptions,
    next_run_id: AtomicU64,
}

impl<B: ProcessBackend> std::fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Supervisor<TokioProcessBackend> {
    /// Supervisor spawning real processes and reading the real filesystem.
    pub fn with_real_backend(options: SupervisorOptions) -> Self {
        Self::new(TokioProcessBackend::new(), Arc::new(RealFileSystem), options)
    }
}

impl<B: ProcessBackend> Supervisor<B> {
    pub fn new(backend: B, fs: Arc<dyn FileSystem>, options: SupervisorOptions) -> Self {
        Self {
            backend,
            fs,
            options,
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// The command line `start` would launch for `request`.
    pub fn command_for(&self, request: &RunRequest) -> LaunchCommand {
        LaunchCommand::for_request(request, &self.options.launch)
    }

    /// Launch one run.
    ///
    /// If the process cannot be spawned, the observer receives a diagnostic
    /// line followed by `on_finished`, and the same error is returned here.
    /// Once the process is running, every failure is reported through the
    /// observer and the final [`RunOutcome`] only.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<O: RunObserver>(
        &self,
        request: &RunRequest,
        mut observer: O,
    ) -> std::result::Result<RunHandle, RunError> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let command = self.command_for(request);

        info!(
            run_id,
            cmd = %command,
            expected_total = request.expected_total().get(),
            "starting run"
        );

        let child = match self.backend.spawn(&command) {
            Ok(child) => child,
            Err(e) => {
                let err = RunError::Launch {
                    program: command.executable_arg().to_string(),
                    machinefile: self.options.launch.machinefile.clone(),
                    reason: e.to_string(),
                };
                error!(run_id, error = %e, "failed to launch process");
                observer.on_output(&err.to_string());
                observer.on_finished();
                return Err(err);
            }
        };

        let ctx = RunContext {
            run_id,
            child,
            observer,
            classifier: self.options.classifier.clone(),
            estimator: Estimator::new(request.expected_total(), Instant::now()),
            artifact: self.options.artifact.clone(),
            fs: Arc::clone(&self.fs),
            working_dir: request.working_dir().to_path_buf(),
            phase: RunPhase::Running,
        };

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let outcome = drive_run(ctx, cancel_rx).await;
            debug!(run_id, status = ?outcome.status, "run task finished");
            outcome
        });

        Ok(RunHandle {
            run_id,
            stopper: StopHandle {
                run_id,
                cancel: Arc::new(Mutex::new(Some(cancel_tx))),
            },
            join,
        })
    }
}

/// Caller-side handle to one run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: u64,
    stopper: StopHandle,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Request forced termination. Repeated calls are no-ops.
    pub fn stop(&self) {
        self.stopper.stop();
    }

    /// Cloneable stop trigger, e.g. for a Ctrl-C listener.
    pub fn stop_handle(&self) -> StopHandle {
        self.stopper.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> Result<RunOutcome> {
        self.join
            .await
            .map_err(|e| MpiwatchError::Other(anyhow::Error::new(e)))
    }
}

#[derive(Debug, Clone)]
pub struct StopHandle {
    run_id: u64,
    cancel: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl StopHandle {
    pub fn stop(&self) {
        let sender = self
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match sender {
            Some(cancel) => {
                info!(run_id = self.run_id, "stop requested");
                if cancel.send(()).is_err() {
                    debug!(run_id = self.run_id, "run already finished; stop ignored");
                }
            }
            None => {
                debug!(run_id = self.run_id, "stop already requested; ignoring");
            }
        }
    }
}
