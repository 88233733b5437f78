// src/config/model.rs

use serde::Deserialize;

use crate::exec::LaunchSettings;
use crate::progress::{ClassificationRule, Classifier};
use crate::supervisor::{ArtifactSettings, SupervisorOptions};
use crate::types::DEFAULT_WORKERS;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [launch]
/// launcher = "mpiexec"
/// machinefile = "machinefile"
/// workers = 19
/// executable = "procesador"
///
/// [artifact]
/// file = "results.txt"
/// poll_attempts = 30
/// poll_interval = "100ms"
///
/// [[rule]]
/// prefix = "[Rank"
/// contains = "blur aplicado"
/// weight = 1
/// ```
///
/// When at least one `[[rule]]` is given, the rules replace the built-in
/// classification table entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub launch: LaunchSection,

    #[serde(default)]
    pub artifact: ArtifactSection,

    #[serde(default, rename = "rule")]
    pub rules: Vec<ClassificationRule>,
}

/// `[launch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaunchSection {
    #[serde(default = "default_launcher")]
    pub launcher: String,

    #[serde(default = "default_machinefile")]
    pub machinefile: String,

    /// Number of MPI processes (`-n`).
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Program name, looked up in the working directory.
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_launcher() -> String {
    "mpiexec".to_string()
}

fn default_machinefile() -> String {
    "machinefile".to_string()
}

fn default_workers() -> u32 {
    DEFAULT_WORKERS
}

fn default_executable() -> String {
    "procesador".to_string()
}

impl Default for LaunchSection {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            machinefile: default_machinefile(),
            workers: default_workers(),
            executable: default_executable(),
        }
    }
}

/// `[artifact]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactSection {
    #[serde(default = "default_artifact_file")]
    pub file: String,

    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    /// Duration string such as `"100ms"` or `"1s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_artifact_file() -> String {
    "results.txt".to_string()
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_poll_interval() -> String {
    "100ms".to_string()
}

impl Default for ArtifactSection {
    fn default() -> Self {
        Self {
            file: default_artifact_file(),
            poll_attempts: default_poll_attempts(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// take the defaults.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub launch: LaunchSection,
    pub artifact: ArtifactSettings,
    pub classifier: Classifier,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        launch: LaunchSection,
        artifact: ArtifactSettings,
        classifier: Classifier,
    ) -> Self {
        Self {
            launch,
            artifact,
            classifier,
        }
    }

    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            launcher: self.launch.launcher.clone(),
            machinefile: self.launch.machinefile.clone(),
        }
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            launch: self.launch_settings(),
            artifact: self.artifact.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            LaunchSection::default(),
            ArtifactSettings::default(),
            Classifier::default(),
        )
    }
}
