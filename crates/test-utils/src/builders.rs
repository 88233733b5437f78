#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use mpiwatch::progress::{ClassificationRule, Classifier};
use mpiwatch::supervisor::{ArtifactSettings, SupervisorOptions};
use mpiwatch::types::{RunRequest, DEFAULT_WORKERS};

/// Builder for `RunRequest` with test-friendly defaults
/// (kernel 55, 19 workers, one image = 6 expected events).
pub struct RunRequestBuilder {
    working_dir: PathBuf,
    kernel: i64,
    executable: String,
    workers: u32,
    expected_total: u64,
}

impl RunRequestBuilder {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            kernel: 55,
            executable: "procesador".to_string(),
            workers: DEFAULT_WORKERS,
            expected_total: 6,
        }
    }

    pub fn kernel(mut self, kernel: i64) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn executable(mut self, name: &str) -> Self {
        self.executable = name.to_string();
        self
    }

    pub fn workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    pub fn expected_total(mut self, total: u64) -> Self {
        self.expected_total = total;
        self
    }

    pub fn build(self) -> RunRequest {
        RunRequest::new(
            self.working_dir,
            self.kernel,
            self.executable,
            self.workers,
            self.expected_total,
        )
        .expect("Failed to build valid RunRequest from builder")
    }
}

/// Builder for `SupervisorOptions`; artifact polling defaults to 10 x 10ms
/// so timeout paths stay fast.
pub struct OptionsBuilder {
    options: SupervisorOptions,
    rules: Vec<ClassificationRule>,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: SupervisorOptions {
                artifact: ArtifactSettings {
                    poll_attempts: 10,
                    poll_interval: Duration::from_millis(10),
                    ..ArtifactSettings::default()
                },
                ..SupervisorOptions::default()
            },
            rules: Vec::new(),
        }
    }

    pub fn launcher(mut self, launcher: &str) -> Self {
        self.options.launch.launcher = launcher.to_string();
        self
    }

    pub fn machinefile(mut self, name: &str) -> Self {
        self.options.launch.machinefile = name.to_string();
        self
    }

    pub fn artifact_file(mut self, name: &str) -> Self {
        self.options.artifact.file = name.to_string();
        self
    }

    pub fn poll(mut self, attempts: u32, interval: Duration) -> Self {
        self.options.artifact.poll_attempts = attempts;
        self.options.artifact.poll_interval = interval;
        self
    }

    pub fn rule(mut self, prefix: &str, contains: &str, weight: u32) -> Self {
        self.rules.push(ClassificationRule::new(prefix, contains, weight));
        self
    }

    pub fn build(mut self) -> SupervisorOptions {
        if !self.rules.is_empty() {
            self.options.classifier =
                Classifier::new(self.rules).expect("Failed to build classifier from builder");
        }
        self.options
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
