// src/supervisor/run.rs

//! The per-run state machine, driven on its own Tokio task.
//!
//! ```text
//! Running --line--> Running
//! Running --stop--> Stopping --kill--> Stopped
//! Running --exit--> Exited(0) --> RetrievingArtifact --> Completed
//! Running --exit--> Exited(n) --> Completed
//! ```
//!
//! Every terminal state reached from `Running` ends with the same sequence:
//! progress 100, remaining 0, finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::errors::RunError;
use crate::exec::ChildProcess;
use crate::fs::FileSystem;
use crate::progress::{Classifier, Estimator};
use crate::types::{RunOutcome, RunStatus};

use super::artifact::{retrieve_artifact, ArtifactSettings, COST_REPORT, RESULTS_HEADER};
use super::observer::RunObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Stopping,
    Stopped,
    Exited(i32),
    RetrievingArtifact,
    Completed,
}

/// Everything one run owns. Nothing here is shared with other runs.
pub(crate) struct RunContext<O: RunObserver> {
    pub run_id: u64,
    pub child: Box<dyn ChildProcess>,
    pub observer: O,
    pub classifier: Classifier,
    pub estimator: Estimator,
    pub artifact: ArtifactSettings,
    pub fs: Arc<dyn FileSystem>,
    pub working_dir: PathBuf,
    pub phase: RunPhase,
}

impl<O: RunObserver> RunContext<O> {
    fn transition(&mut self, next: RunPhase) {
        debug!(run_id = self.run_id, from = ?self.phase, to = ?next, "run phase change");
        self.phase = next;
    }

    /// Forward one output line, then refresh the estimate.
    ///
    /// Lines without a progress phrase still refresh the remaining time,
    /// since the elapsed time changed even though the event count did not.
    fn handle_line(&mut self, raw: &str) {
        let line = raw.trim_end();
        self.observer.on_output(line);

        let weight = self.classifier.classify(line);
        let update = self.estimator.update(weight, Instant::now());
        if weight > 0 {
            debug!(
                run_id = self.run_id,
                weight,
                events = self.estimator.events(),
                percentage = update.percentage,
                "progress event"
            );
        }

        if update.percentage < 100 {
            self.observer.on_progress(update.percentage as u32);
        }
        if let Some(remaining) = update.remaining_secs {
            self.observer.on_time_remaining(remaining);
        }
    }

    fn emit_terminal_sequence(&mut self) {
        self.observer.on_progress(100);
        self.observer.on_time_remaining(0.0);
        self.observer.on_finished();
    }

    fn outcome(
        &self,
        status: RunStatus,
        artifact: Option<String>,
        error: Option<RunError>,
    ) -> RunOutcome {
        RunOutcome {
            status,
            artifact,
            error,
            events: self.estimator.events(),
        }
    }
}

/// Drive a launched run to a terminal state.
///
/// `cancel_rx` fires when `stop()` is called. If the sender is dropped
/// without firing, the run simply continues.
pub(crate) async fn drive_run<O: RunObserver>(
    mut ctx: RunContext<O>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> RunOutcome {
    let mut cancel_armed = true;

    // Stream output until the child closes its pipes or a stop arrives.
    let stopped = loop {
        tokio::select! {
            biased;

            cancel = &mut cancel_rx, if cancel_armed => {
                match cancel {
                    Ok(()) => break true,
                    Err(_) => {
                        debug!(run_id = ctx.run_id, "run handle dropped; stop no longer possible");
                        cancel_armed = false;
                    }
                }
            }

            line = ctx.child.next_line() => {
                match line {
                    Ok(Some(line)) => ctx.handle_line(&line),
                    Ok(None) => break false,
                    Err(e) => {
                        warn!(run_id = ctx.run_id, error = %e, "error reading process output");
                        break false;
                    }
                }
            }
        }
    };

    let exit_code = if stopped {
        None
    } else {
        loop {
            tokio::select! {
                biased;

                cancel = &mut cancel_rx, if cancel_armed => {
                    match cancel {
                        Ok(()) => break None,
                        Err(_) => cancel_armed = false,
                    }
                }

                status = ctx.child.wait() => {
                    break Some(status.unwrap_or_else(|e| {
                        error!(run_id = ctx.run_id, error = %e, "failed waiting for process");
                        -1
                    }));
                }
            }
        }
    };

    match exit_code {
        None => stop_run(ctx).await,
        Some(code) => complete_run(ctx, code).await,
    }
}

async fn stop_run<O: RunObserver>(mut ctx: RunContext<O>) -> RunOutcome {
    ctx.transition(RunPhase::Stopping);
    info!(run_id = ctx.run_id, "stop requested; killing process");

    if let Err(e) = ctx.child.kill().await {
        warn!(run_id = ctx.run_id, error = %e, "failed to kill process on stop");
    }

    ctx.transition(RunPhase::Stopped);
    ctx.emit_terminal_sequence();
    ctx.outcome(RunStatus::Stopped, None, None)
}

async fn complete_run<O: RunObserver>(mut ctx: RunContext<O>, code: i32) -> RunOutcome {
    ctx.transition(RunPhase::Exited(code));
    info!(
        run_id = ctx.run_id,
        exit_code = code,
        events = ctx.estimator.events(),
        "process exited"
    );

    let outcome = if code == 0 {
        ctx.transition(RunPhase::RetrievingArtifact);
        let path = ctx.working_dir.join(&ctx.artifact.file);

        match retrieve_artifact(ctx.fs.as_ref(), &path, &ctx.artifact).await {
            Ok(content) => {
                ctx.observer.on_output(RESULTS_HEADER);
                ctx.observer.on_output(&content);
                ctx.observer.on_output(COST_REPORT);
                ctx.outcome(RunStatus::Succeeded, Some(content), None)
            }
            Err(err) => {
                ctx.observer.on_output(&err.to_string());
                ctx.outcome(RunStatus::Succeeded, None, Some(err))
            }
        }
    } else {
        let err = RunError::NonZeroExit { code };
        ctx.observer.on_output(&err.to_string());
        ctx.outcome(RunStatus::Failed(code), None, Some(err))
    };

    ctx.transition(RunPhase::Completed);
    ctx.emit_terminal_sequence();
    outcome
}
