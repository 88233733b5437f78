// src/exec/command.rs

use std::fmt;
use std::path::PathBuf;

use crate::types::RunRequest;

/// Launcher-level settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// MPI launcher binary, looked up on `PATH` unless absolute.
    pub launcher: String,
    /// Machine list file, relative to the working directory.
    pub machinefile: String,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            launcher: "mpiexec".to_string(),
            machinefile: "machinefile".to_string(),
        }
    }
}

/// Fully resolved command for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl LaunchCommand {
    /// `<launcher> -n <workers> -f <machinefile> ./<exe> <kernel>`, run from
    /// the request's working directory.
    pub fn for_request(request: &RunRequest, settings: &LaunchSettings) -> Self {
        let args = vec![
            "-n".to_string(),
            request.workers().to_string(),
            "-f".to_string(),
            settings.machinefile.clone(),
            format!("./{}", request.executable()),
            request.kernel().to_string(),
        ];

        Self {
            program: settings.launcher.clone(),
            args,
            cwd: request.working_dir().to_path_buf(),
        }
    }

    /// The executable argument (`./<exe>`), used in diagnostics.
    pub fn executable_arg(&self) -> &str {
        self.args.get(4).map(String::as_str).unwrap_or(&self.program)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
