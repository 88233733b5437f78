// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod input;
pub mod logging;
pub mod progress;
pub mod supervisor;
pub mod types;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile};
use crate::console::ConsoleObserver;
use crate::fs::RealFileSystem;
use crate::input::{prepare_request, PreparedRun};
use crate::supervisor::Supervisor;

pub use crate::errors::{MpiwatchError, RunError};
pub use crate::types::{EventWeight, RunOutcome, RunRequest, RunStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - input validation / request preparation
/// - the supervisor with the real process backend
/// - a console observer
/// - Ctrl-C handling (forced stop)
///
/// Returns whether the run succeeded.
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    if let Some(exe) = &args.executable {
        cfg.launch.executable = exe.clone();
    }

    let prepared = prepare_request(
        &RealFileSystem,
        &args.images,
        args.kernel,
        &cfg.launch,
        args.workers,
    )?;

    let supervisor = Supervisor::with_real_backend(cfg.supervisor_options());

    if args.dry_run {
        print_dry_run(&cfg, &prepared, &supervisor);
        return Ok(true);
    }

    let handle = match supervisor.start(&prepared.request, ConsoleObserver::new()) {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "run could not be launched");
            return Ok(false);
        }
    };

    // Ctrl-C → forced stop.
    {
        let stopper = handle.stop_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C; stop on interrupt disabled");
                return;
            }
            stopper.stop();
        });
    }

    let outcome = handle.wait().await?;
    info!(status = ?outcome.status, events = outcome.events, "run finished");

    Ok(outcome.is_success())
}

fn print_dry_run<B: exec::ProcessBackend>(
    cfg: &ConfigFile,
    prepared: &PreparedRun,
    supervisor: &Supervisor<B>,
) {
    let request = &prepared.request;
    println!("mpiwatch dry-run");
    println!("  working dir    = {}", request.working_dir().display());
    println!("  command        = {}", supervisor.command_for(request));
    println!("  images         = {}", prepared.image_count);
    println!("  expected total = {}", request.expected_total());
    println!(
        "  artifact       = {} ({} x {:?})",
        cfg.artifact.file, cfg.artifact.poll_attempts, cfg.artifact.poll_interval
    );
    println!("  rules          = {}", cfg.classifier.len());
}
