//! Named pipelines: ordered task lists gated by the enable toggles.

use std::str::FromStr;

use wfe_core::{Config, PipelineError, Result};

use crate::process::Sink;
use crate::tasks::{TaskContext, TaskKind, TaskOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    ImageBuild,
    ImageScan,
    CodeScan,
    ImagePublish,
    Deploy,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 5] = [
        PipelineKind::ImageBuild,
        PipelineKind::ImageScan,
        PipelineKind::CodeScan,
        PipelineKind::ImagePublish,
        PipelineKind::Deploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::ImageBuild => "image-build",
            PipelineKind::ImageScan => "image-scan",
            PipelineKind::CodeScan => "code-scan",
            PipelineKind::ImagePublish => "image-publish",
            PipelineKind::Deploy => "deploy",
        }
    }

    /// Tasks to run in order, or `None` when the pipeline is disabled.
    pub fn tasks(&self, config: &Config) -> Option<Vec<TaskKind>> {
        match self {
            PipelineKind::ImageBuild => config
                .image_build
                .enabled
                .then(|| vec![TaskKind::ImageBuild, TaskKind::ImageSave]),
            PipelineKind::ImageScan => config.image_scan.enabled.then(|| {
                let mut tasks = vec![TaskKind::ImageVulScan];
                if config.image_scan.clamav_enabled {
                    tasks.push(TaskKind::ImageAntivirusScan);
                }
                tasks
            }),
            PipelineKind::CodeScan => config.code_scan.enabled.then(|| vec![TaskKind::CodeScan]),
            PipelineKind::ImagePublish => config.image_publish.enabled.then(|| {
                let mut tasks = vec![TaskKind::ImagePush, TaskKind::Bundle];
                if config.image_publish.bundle_enabled {
                    tasks.push(TaskKind::BundlePublish);
                }
                tasks
            }),
            PipelineKind::Deploy => config.deploy.enabled.then(|| vec![TaskKind::Validate]),
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        PipelineKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = PipelineKind::ALL.iter().map(|k| k.as_str()).collect();
                PipelineError::Configuration(format!(
                    "unknown pipeline '{s}' (available: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Run every task of `kind` serially; the first failure stops the pipeline.
pub async fn run_pipeline(
    kind: PipelineKind,
    config: &Config,
    ctx: &TaskContext,
    stderr: &Sink,
) -> Result<()> {
    let Some(tasks) = kind.tasks(config) else {
        tracing::info!(pipeline = kind.as_str(), "Pipeline disabled, skipping");
        return Ok(());
    };

    let options = TaskOptions::from_config(config);
    tracing::info!(pipeline = kind.as_str(), tasks = tasks.len(), "Running pipeline");
    for task in tasks {
        task.build(&options).run(ctx, stderr).await?;
    }
    tracing::info!(pipeline = kind.as_str(), "Pipeline completed");
    Ok(())
}
