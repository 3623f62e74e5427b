//! `workflow-engine run-pipeline` command.

use clap::Args;

use wfe_runtime::{run_pipeline, PipelineKind, Sink};

use super::{CommandContext, RunArgs};
use crate::error::CliError;

#[derive(Args, Debug)]
pub struct RunPipelineArgs {
    /// Pipeline name (image-build, image-scan, code-scan, image-publish, deploy)
    pub name: String,

    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn execute(args: RunPipelineArgs, ctx: &CommandContext) -> Result<(), CliError> {
    let kind: PipelineKind = args
        .name
        .parse()
        .map_err(|e: wfe_core::PipelineError| CliError::UserInput(e.to_string()))?;
    let config = ctx.resolve_config(args.run.config.as_deref())?;

    let task_ctx = ctx.task_context(&args.run);
    run_pipeline(kind, &config, &task_ctx, &Sink::stderr())
        .await
        .map_err(CliError::Command)
}
