//! Workflow Engine Core - configuration model and shared types.
//!
//! Every tunable is described once in the field catalog ([`meta::MetaConfig`]),
//! resolved flag → environment → default, and bound into the typed
//! [`config::Config`] record before any task runs.

pub mod binder;
pub mod config;
pub mod error;
pub mod exit;
pub mod format;
pub mod meta;

// Re-export commonly used types
pub use binder::{fold_defaults, unmarshal, unmarshal_with_sources};
pub use config::{Bind, Config, ConfigVisitor, LeafMut};
pub use error::{PipelineError, Result, ValidationErrors};
pub use exit::ExitCode;
pub use format::ConfigFormat;
pub use meta::{Environment, FieldKind, MetaConfig, MetaField, ProcessEnv, Source, Value};

/// Workflow engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
