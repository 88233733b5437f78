// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! - `TokioProcessBackend` is the production implementation. It spawns the
//!   launcher with `tokio::process::Command`. On unix, stdout and stderr
//!   share one pipe, so lines reach the supervisor in the order the process
//!   wrote them. Elsewhere the two streams are piped separately and merged
//!   in arrival order.
//! - Tests provide their own `ProcessBackend` that replays scripted lines and
//!   exit codes without spawning anything.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{MpiwatchError, Result};

use super::command::LaunchCommand;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A running child process as seen by the supervisor.
pub trait ChildProcess: Send {
    /// Next line of combined output without the trailing newline, or `None`
    /// once every output stream has closed.
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>>;

    /// Wait for the process to exit and return its exit code (`-1` when the
    /// process was terminated by a signal).
    fn wait(&mut self) -> BoxFuture<'_, Result<i32>>;

    /// Forcefully terminate the process. No grace period.
    fn kill(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Trait abstracting how a run's process is started.
pub trait ProcessBackend: Send + Sync {
    /// Spawn `command`. An error here means the process never started.
    fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn ChildProcess>>;
}

/// Real backend used in production.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessBackend;

impl TokioProcessBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for TokioProcessBackend {
    fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn ChildProcess>> {
        info!(cmd = %command, cwd = ?command.cwd, "spawning process");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let (tx, rx) = mpsc::channel::<String>(256);
        let child = spawn_with_combined_output(cmd, tx)?;

        Ok(Box::new(TokioChild { child, lines: rx }))
    }
}

/// Spawn `cmd` with stdout and stderr writing into the same pipe.
///
/// `cmd` is consumed so the parent's copies of the write end are closed
/// right after the spawn; the reader sees EOF once the child side closes.
#[cfg(unix)]
fn spawn_with_combined_output(mut cmd: Command, tx: mpsc::Sender<String>) -> Result<Child> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = std::io::pipe()?;
    let writer_err = writer.try_clone()?;
    cmd.stdout(writer).stderr(writer_err);

    let child = cmd.spawn().map_err(MpiwatchError::IoError)?;
    drop(cmd);

    let reader = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
    tokio::spawn(forward_lines(reader, tx, "combined"));

    Ok(child)
}

#[cfg(not(unix))]
fn spawn_with_combined_output(mut cmd: Command, tx: mpsc::Sender<String>) -> Result<Child> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(MpiwatchError::IoError)?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone(), "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx, "stderr"));
    }

    Ok(child)
}

struct TokioChild {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl ChildProcess for TokioChild {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move { Ok(self.lines.recv().await) })
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<i32>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(status.code().unwrap_or(-1))
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.child.kill().await?;
            Ok(())
        })
    }
}

/// Read `reader` line by line and push each line into `tx`.
///
/// Bytes are decoded lossily so a stray non-UTF-8 byte does not end the
/// stream. Lines keep the order in which they were read.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    debug!(stream, "line receiver dropped; stopping forwarder");
                    break;
                }
            }
            Err(e) => {
                debug!(stream, error = %e, "error reading child output; stopping forwarder");
                break;
            }
        }
    }

    debug!(stream, "output forwarder ended");
}
