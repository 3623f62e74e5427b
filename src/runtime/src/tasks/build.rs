//! `image-build`: docker/podman build or docker buildx bake.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;

use wfe_core::{PipelineError, Result, ValidationErrors};

use super::options::{ImageBuildOptions, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, StdoutTarget, ToolPaths};

/// Container CLI selected by `CliInterface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliInterface {
    Docker,
    Podman,
    /// `docker buildx bake`; only meaningful for builds.
    Bake,
}

impl CliInterface {
    /// Program for the generic (non-bake) commands: build, save, push.
    pub fn program<'a>(&self, tools: &'a ToolPaths) -> &'a str {
        match self {
            CliInterface::Podman => &tools.podman,
            CliInterface::Docker | CliInterface::Bake => &tools.docker,
        }
    }

    /// Parse an interface that must be docker or podman.
    pub fn parse_engine(s: &str) -> std::result::Result<Self, String> {
        match s.parse::<CliInterface>()? {
            CliInterface::Bake => Err(format!(
                "unsupported CLI interface '{s}' (expected docker or podman)"
            )),
            engine => Ok(engine),
        }
    }
}

impl FromStr for CliInterface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(CliInterface::Docker),
            "podman" => Ok(CliInterface::Podman),
            "bake" | "buildx-bake" => Ok(CliInterface::Bake),
            _ => Err(format!(
                "unsupported CLI interface '{s}' (expected docker, podman or bake)"
            )),
        }
    }
}

/// Decode the JSON build-argument object into sorted `key=value` pairs.
fn parse_build_args(raw: &str) -> std::result::Result<Vec<String>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| format!("build args must be a JSON object of strings: {e}"))?;
    Ok(map
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect())
}

fn validate_options(cli: &str, options: &ImageBuildOptions) -> Result<()> {
    let mut errors = ValidationErrors::new();
    match cli.parse::<CliInterface>() {
        Ok(CliInterface::Bake) => {
            errors.require(&options.bakefile, "bakefile required");
            errors.require(&options.bake_target, "bake target required");
        }
        Ok(_) => {
            if let Err(e) = parse_build_args(&options.build_args) {
                errors.push(e);
            }
            errors.require(&options.dockerfile, "Dockerfile required");
            errors.require(&options.context, "context required");
        }
        Err(e) => errors.push(e),
    }
    errors.into_result()
}

/// Assemble the build command line.
///
/// Generic builds emit, in order: sorted `--build-arg` pairs, `--platform`,
/// `--target`, `--cache-to`, `--cache-from`, `--squash-layers`, `--tag`,
/// `--file` and finally the context directory.
pub fn build_command(
    cli: CliInterface,
    options: &ImageBuildOptions,
    tools: &ToolPaths,
) -> Result<CommandSpec> {
    if cli == CliInterface::Bake {
        return Ok(CommandSpec::new(&tools.docker).args([
            "buildx",
            "bake",
            "--file",
            options.bakefile.as_str(),
            options.bake_target.as_str(),
        ]));
    }

    let mut command = CommandSpec::new(cli.program(tools)).arg("build");
    for pair in parse_build_args(&options.build_args).map_err(PipelineError::Configuration)? {
        command = command.arg("--build-arg").arg(pair);
    }
    for (flag, value) in [
        ("--platform", &options.platform),
        ("--target", &options.target),
        ("--cache-to", &options.cache_to),
        ("--cache-from", &options.cache_from),
    ] {
        if !value.is_empty() {
            command = command.arg(flag).arg(value);
        }
    }
    if options.squash_layers {
        command = command.arg("--squash-layers");
    }
    if !options.tag.is_empty() {
        command = command.arg("--tag").arg(&options.tag);
    }
    Ok(command
        .arg("--file")
        .arg(&options.dockerfile)
        .arg(&options.context))
}

/// Builds the container image.
#[derive(Debug, Clone)]
pub struct ImageBuildTask {
    cli_interface: String,
    options: ImageBuildOptions,
}

impl ImageBuildTask {
    pub fn new(cli_interface: impl Into<String>, options: ImageBuildOptions) -> Self {
        Self {
            cli_interface: cli_interface.into(),
            options,
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(&options.cli_interface, options.build.clone())
    }
}

#[async_trait]
impl Task for ImageBuildTask {
    fn name(&self) -> &'static str {
        "image-build"
    }

    fn validate(&self) -> Result<()> {
        validate_options(&self.cli_interface, &self.options)
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let cli = self
            .cli_interface
            .parse::<CliInterface>()
            .map_err(PipelineError::Configuration)?;
        let command = build_command(cli, &self.options, &ctx.tools)?;
        tracing::debug!(command = %command, "Assembled image build command");

        let options = ctx
            .run_options(self.name())
            .stdout(StdoutTarget::Lines(stderr.clone()))
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&command, options, &ctx.cancel).await.into_result(self.name())
    }
}
