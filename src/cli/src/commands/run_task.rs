//! `workflow-engine run-task` command.

use clap::Args;

use wfe_runtime::{Sink, TaskKind, TaskOptions};

use super::{CommandContext, RunArgs};
use crate::error::CliError;

#[derive(Args, Debug)]
pub struct RunTaskArgs {
    /// Task name (image-build, image-save, image-vul-scan, image-antivirus-scan,
    /// image-push, sast-code-scan, secrets-code-scan, code-scan, bundle,
    /// bundle-publish, validate)
    pub name: String,

    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn execute(args: RunTaskArgs, ctx: &CommandContext) -> Result<(), CliError> {
    let kind: TaskKind = args
        .name
        .parse()
        .map_err(|e: wfe_core::PipelineError| CliError::UserInput(e.to_string()))?;
    let config = ctx.resolve_config(args.run.config.as_deref())?;

    let task = kind.build(&TaskOptions::from_config(&config));
    let task_ctx = ctx.task_context(&args.run);
    task.run(&task_ctx, &Sink::stderr())
        .await
        .map_err(CliError::Command)
}
