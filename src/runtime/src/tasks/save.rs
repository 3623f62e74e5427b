//! `image-save`: export the image to a tar archive.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use wfe_core::{PipelineError, Result, ValidationErrors};

use super::build::CliInterface;
use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, FileMonitor, Sink, StderrTarget};

#[derive(Debug, Clone)]
pub struct ImageSaveTask {
    cli_interface: String,
    image: String,
    tar_path: PathBuf,
    progress_interval: Duration,
}

impl ImageSaveTask {
    pub fn new(
        cli_interface: impl Into<String>,
        image: impl Into<String>,
        tar_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cli_interface: cli_interface.into(),
            image: image.into(),
            tar_path: tar_path.into(),
            progress_interval: Duration::ZERO,
        }
    }

    /// Report the tar size every `interval`; zero disables reporting.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.cli_interface,
            &options.image_name,
            options.artifact_path(&options.image_tar_filename),
        )
        .with_progress_interval(options.save_progress_interval)
    }
}

#[async_trait]
impl Task for ImageSaveTask {
    fn name(&self) -> &'static str {
        "image-save"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = CliInterface::parse_engine(&self.cli_interface) {
            errors.push(e);
        }
        errors.require(&self.image, "image name required");
        errors.require(&display_path(&self.tar_path), "image tar path required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let cli = CliInterface::parse_engine(&self.cli_interface)
            .map_err(PipelineError::Configuration)?;
        let command = CommandSpec::new(cli.program(&ctx.tools)).args(["save", self.image.as_str()]);

        let stdout = ctx.artifact_output(&self.tar_path)?;
        let monitor = (!ctx.dry_run && !self.progress_interval.is_zero()).then(|| {
            FileMonitor::spawn(
                &self.tar_path,
                self.progress_interval,
                stderr.clone(),
                self.name(),
                &ctx.cancel,
            )
        });

        let options = ctx
            .run_options(self.name())
            .stdout(stdout)
            .stderr(StderrTarget::Sink(stderr.clone()));
        let code = run(&command, options, &ctx.cancel).await;

        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        code.into_result(self.name())
    }
}
