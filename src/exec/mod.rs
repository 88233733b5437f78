// src/exec/mod.rs

//! Process execution layer.
//!
//! The supervisor never touches `tokio::process` directly; it talks to a
//! [`ProcessBackend`]. This keeps the run state machine testable with a
//! scripted fake while production uses real OS processes.
//!
//! - [`command`] builds the MPI launch command line for a run.
//! - [`backend`] provides the `ProcessBackend` / `ChildProcess` traits and
//!   the concrete [`TokioProcessBackend`].

pub mod backend;
pub mod command;

pub use backend::{BoxFuture, ChildProcess, ProcessBackend, TokioProcessBackend};
pub use command::{LaunchCommand, LaunchSettings};
