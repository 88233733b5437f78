use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mpiwatch::errors::{MpiwatchError, Result};
use mpiwatch::exec::{BoxFuture, ChildProcess, LaunchCommand, ProcessBackend};
use mpiwatch::fs::mock::MockFileSystem;

/// What a scripted child process does.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub lines: Vec<String>,
    pub exit_code: i32,
    /// Pause before each line.
    pub line_delay: Option<Duration>,
    /// After the last line, keep the output open until killed.
    pub hang: bool,
    /// Refuse to spawn, like a missing launcher.
    pub fail_spawn: bool,
    /// Write this file into the mock filesystem when the process exits.
    pub artifact_on_exit: Option<(MockFileSystem, PathBuf, Vec<u8>)>,
}

impl Script {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = Some(delay);
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn fail_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    pub fn artifact_on_exit(
        mut self,
        fs: &MockFileSystem,
        path: impl Into<PathBuf>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.artifact_on_exit = Some((fs.clone(), path.into(), content.into()));
        self
    }
}

/// A fake backend that:
/// - records every command it was asked to spawn
/// - replays the script's lines and exit code instead of running anything.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Script,
    spawned: Arc<Mutex<Vec<LaunchCommand>>>,
    killed: Arc<AtomicBool>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            spawned: Arc::new(Mutex::new(Vec::new())),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn spawned(&self) -> Vec<LaunchCommand> {
        self.spawned.lock().unwrap().clone()
    }

    /// Shared flag set when the child is killed.
    pub fn killed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.killed)
    }
}

impl ProcessBackend for ScriptedBackend {
    fn spawn(&self, command: &LaunchCommand) -> Result<Box<dyn ChildProcess>> {
        self.spawned.lock().unwrap().push(command.clone());

        if self.script.fail_spawn {
            return Err(MpiwatchError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not found", command.program),
            )));
        }

        Ok(Box::new(ScriptedChild {
            lines: self.script.lines.iter().cloned().collect(),
            line_delay: self.script.line_delay,
            hang: self.script.hang,
            exit_code: self.script.exit_code,
            artifact_on_exit: self.script.artifact_on_exit.clone(),
            killed: Arc::clone(&self.killed),
        }))
    }
}

struct ScriptedChild {
    lines: VecDeque<String>,
    line_delay: Option<Duration>,
    hang: bool,
    exit_code: i32,
    artifact_on_exit: Option<(MockFileSystem, PathBuf, Vec<u8>)>,
    killed: Arc<AtomicBool>,
}

impl ChildProcess for ScriptedChild {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            if let Some(delay) = self.line_delay {
                tokio::time::sleep(delay).await;
            }
            match self.lines.pop_front() {
                Some(line) => Ok(Some(line)),
                None if self.hang => std::future::pending::<Result<Option<String>>>().await,
                None => Ok(None),
            }
        })
    }

    fn wait(&mut self) -> BoxFuture<'_, Result<i32>> {
        Box::pin(async move {
            if self.hang {
                return std::future::pending::<Result<i32>>().await;
            }
            if let Some((fs, path, content)) = self.artifact_on_exit.take() {
                fs.add_file(path, content);
            }
            Ok(self.exit_code)
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.killed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}
