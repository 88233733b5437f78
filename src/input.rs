// src/input.rs

//! Turning user input into a [`RunRequest`].
//!
//! The layout expected on disk is:
//!
//! ```text
//! project/
//! ├── machinefile
//! ├── procesador        (the MPI executable, with the execute bit set)
//! ├── images/           (the folder the user selects)
//! │   ├── a.bmp
//! │   └── b.BMP
//! └── results.txt       (written by the executable)
//! ```
//!
//! The run's working directory is the parent of the images folder, and the
//! expected event count is six per image.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::LaunchSection;
use crate::errors::{MpiwatchError, Result};
use crate::fs::FileSystem;
use crate::types::RunRequest;

/// Event weight one image contributes when fully processed.
pub const EVENTS_PER_IMAGE: u64 = 6;

pub const KERNEL_MIN: i64 = 55;
pub const KERNEL_MAX: i64 = 150;

/// A request plus what was learned while building it.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub request: RunRequest,
    pub image_count: u64,
}

/// Kernel size must be odd and within [`KERNEL_MIN`]..=[`KERNEL_MAX`].
pub fn validate_kernel(kernel: i64) -> Result<i64> {
    if !(KERNEL_MIN..=KERNEL_MAX).contains(&kernel) || kernel % 2 == 0 {
        return Err(MpiwatchError::InvalidKernel(kernel));
    }
    Ok(kernel)
}

/// Parent of the images folder, or `.` for a bare relative name.
pub fn working_dir_for(images_dir: &Path) -> PathBuf {
    match images_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Number of files with a `.bmp` extension (any case) directly in `dir`.
pub fn count_bmp_images(fs: &dyn FileSystem, dir: &Path) -> Result<u64> {
    let count = fs
        .read_dir(dir)?
        .iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("bmp"))
        })
        .count();
    Ok(count as u64)
}

/// Validate the user's selection and build the run request.
///
/// `workers` overrides `[launch].workers` when given.
pub fn prepare_request(
    fs: &dyn FileSystem,
    images_dir: &Path,
    kernel: i64,
    launch: &LaunchSection,
    workers: Option<u32>,
) -> Result<PreparedRun> {
    if !fs.is_dir(images_dir) {
        return Err(MpiwatchError::InvalidRequest(format!(
            "images folder {:?} does not exist or is not a directory",
            images_dir
        )));
    }

    let kernel = validate_kernel(kernel)?;

    let working_dir = working_dir_for(images_dir);
    let exe_path = working_dir.join(&launch.executable);
    if !fs.is_executable(&exe_path) {
        return Err(MpiwatchError::ExecutableNotFound {
            name: launch.executable.clone(),
            dir: working_dir,
        });
    }

    let image_count = count_bmp_images(fs, images_dir)?;
    if image_count == 0 {
        return Err(MpiwatchError::NoImages(images_dir.to_path_buf()));
    }
    debug!(?images_dir, image_count, "counted input images");

    let request = RunRequest::new(
        working_dir,
        kernel,
        launch.executable.clone(),
        workers.unwrap_or(launch.workers),
        image_count * EVENTS_PER_IMAGE,
    )?;

    Ok(PreparedRun {
        request,
        image_count,
    })
}
