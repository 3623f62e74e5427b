//! Workflow Engine CLI: run security pipeline tasks against container images and source trees.

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
