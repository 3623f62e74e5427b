//! Workflow Engine Runtime - drives external security tooling.
//!
//! The [`process`] module starts child processes under a cancellation token
//! and streams their stderr line by line with a task label. [`tasks`] composes
//! those primitives into the named task catalog and [`pipeline`] runs ordered
//! groups of tasks.

#![allow(clippy::result_large_err)]

pub mod pipeline;
pub mod process;
pub mod tasks;

// Re-export common types
pub use pipeline::{run_pipeline, PipelineKind};
pub use process::{run, CommandSpec, FileMonitor, RunOptions, Sink, ToolPaths};
pub use tasks::{Task, TaskContext, TaskKind, TaskOptions};

/// Workflow Engine Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
