//! Child process plumbing: the runner, line-labelled streaming, shared sinks
//! and file-size progress.

mod monitor;
mod runner;
mod sink;
mod stream;
mod tools;

pub use monitor::{format_bytes, FileMonitor};
pub use runner::{run, CommandSpec, RunOptions, StderrTarget, StdinSource, StdoutTarget};
pub use sink::{SharedBuffer, Sink};
pub use stream::{copy_lines, stream};
pub use tools::ToolPaths;
