// src/progress/mod.rs

//! Progress inference from the child process's textual output.
//!
//! This is the pure half of the crate: no Tokio, no processes, no IO.
//!
//! - [`classify`] turns an output line into an [`EventWeight`] using a small
//!   table of `(prefix, substring, weight)` rules.
//! - [`estimator`] accumulates weights and extrapolates a completion
//!   percentage and a remaining-time estimate from elapsed wall-clock time.

pub mod classify;
pub mod estimator;

pub use classify::{classify, default_rules, ClassificationRule, Classifier, RANK_PREFIX};
pub use estimator::{Estimator, ProgressState, ProgressUpdate};

pub use crate::types::EventWeight;
