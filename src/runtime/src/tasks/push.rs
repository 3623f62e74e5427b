//! `image-push`.

use async_trait::async_trait;

use wfe_core::{PipelineError, Result, ValidationErrors};

use super::build::CliInterface;
use super::options::TaskOptions;
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, StdoutTarget};

/// Pushes the image with `<cli> push`.
///
/// The image tag is appended positionally only when `tag_argument` is set;
/// otherwise the engine's own default applies.
#[derive(Debug, Clone)]
pub struct ImagePushTask {
    cli_interface: String,
    image: String,
    tag_argument: bool,
}

impl ImagePushTask {
    pub fn new(cli_interface: impl Into<String>, image: impl Into<String>, tag_argument: bool) -> Self {
        Self {
            cli_interface: cli_interface.into(),
            image: image.into(),
            tag_argument,
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.cli_interface,
            &options.image_name,
            options.push_tag_argument,
        )
    }

    fn command(&self, program: &str) -> CommandSpec {
        let command = CommandSpec::new(program).arg("push");
        if self.tag_argument {
            command.arg(&self.image)
        } else {
            command
        }
    }
}

#[async_trait]
impl Task for ImagePushTask {
    fn name(&self) -> &'static str {
        "image-push"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = CliInterface::parse_engine(&self.cli_interface) {
            errors.push(e);
        }
        if self.tag_argument {
            errors.require(&self.image, "image name required");
        }
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let cli = CliInterface::parse_engine(&self.cli_interface)
            .map_err(PipelineError::Configuration)?;
        let command = self.command(cli.program(&ctx.tools));
        let options = ctx
            .run_options(self.name())
            .stdout(StdoutTarget::Lines(stderr.clone()))
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&command, options, &ctx.cancel).await.into_result(self.name())
    }
}
