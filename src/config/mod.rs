// src/config/mod.rs

//! Configuration loading and validation for mpiwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a ready-to-use [`ConfigFile`] (`validate.rs`).
//!
//! Every section is optional; an absent config file means built-in defaults.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ArtifactSection, ConfigFile, LaunchSection, RawConfigFile};
pub use validate::parse_duration;
