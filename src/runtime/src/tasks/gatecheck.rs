//! gatecheck-driven tasks: report listing, bundling, publishing and validation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use wfe_core::{PipelineError, Result, ValidationErrors};

use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, StdoutTarget, ToolPaths};

/// Media type used when pushing a bundle to an OCI registry.
pub const BUNDLE_MEDIA_TYPE: &str = "application/vnd.gatecheck.bundle.tar+gzip";

/// `gatecheck ls <report>`, with the summary going to the display sink.
pub(crate) async fn list_report(ctx: &TaskContext, stderr: &Sink, report: &Path) -> Result<()> {
    let command = CommandSpec::new(&ctx.tools.gatecheck).args(["ls".to_string(), display_path(report)]);
    let options = ctx
        .run_options("gatecheck")
        .stdout(StdoutTarget::Sink(ctx.display.clone()))
        .stderr(StderrTarget::Sink(stderr.clone()));
    run(&command, options, &ctx.cancel).await.into_result("gatecheck")
}

/// Packs security reports into a gatecheck bundle.
///
/// The bundle is created from the first file; every further file is added.
#[derive(Debug, Clone)]
pub struct BundleTask {
    bundle_path: PathBuf,
    files: Vec<PathBuf>,
    /// Used when `files` is empty; only the ones present at run time are bundled.
    fallback: Vec<PathBuf>,
}

impl BundleTask {
    pub fn new(bundle_path: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            bundle_path: bundle_path.into(),
            files,
            fallback: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Vec<PathBuf>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        let files = options
            .bundle_files
            .iter()
            .filter(|f| !f.trim().is_empty())
            .map(PathBuf::from)
            .collect();
        Self::new(options.artifact_path(&options.bundle_filename), files)
            .with_fallback(options.default_bundle_files())
    }

    fn resolve_files(&self, dry_run: bool) -> Vec<PathBuf> {
        if !self.files.is_empty() {
            return self.files.clone();
        }
        self.fallback
            .iter()
            .filter(|p| dry_run || p.exists())
            .cloned()
            .collect()
    }

    fn commands(&self, tools: &ToolPaths, files: &[PathBuf]) -> Vec<CommandSpec> {
        let bundle = display_path(&self.bundle_path);
        files
            .iter()
            .enumerate()
            .map(|(i, file)| {
                let action = if i == 0 { "create" } else { "add" };
                CommandSpec::new(&tools.gatecheck).args([
                    "bundle".to_string(),
                    action.to_string(),
                    bundle.clone(),
                    display_path(file),
                ])
            })
            .collect()
    }
}

#[async_trait]
impl Task for BundleTask {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&display_path(&self.bundle_path), "bundle path required");
        if self.files.is_empty() && self.fallback.is_empty() {
            errors.push("no files to bundle");
        }
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let files = self.resolve_files(ctx.dry_run);
        if files.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "no reports found to bundle into {}",
                self.bundle_path.display()
            )));
        }
        ctx.prepare_artifact(&self.bundle_path)?;

        for command in self.commands(&ctx.tools, &files) {
            let options = ctx
                .run_options(self.name())
                .stdout(StdoutTarget::Lines(stderr.clone()))
                .stderr(StderrTarget::Sink(stderr.clone()));
            run(&command, options, &ctx.cancel).await.into_result(self.name())?;
        }
        Ok(())
    }
}

/// Pushes the bundle to an OCI registry with oras.
#[derive(Debug, Clone)]
pub struct BundlePublishTask {
    bundle_tag: String,
    bundle_path: PathBuf,
}

impl BundlePublishTask {
    pub fn new(bundle_tag: impl Into<String>, bundle_path: impl Into<PathBuf>) -> Self {
        Self {
            bundle_tag: bundle_tag.into(),
            bundle_path: bundle_path.into(),
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.bundle_tag,
            options.artifact_path(&options.bundle_filename),
        )
    }

    fn command(&self, tools: &ToolPaths) -> CommandSpec {
        CommandSpec::new(&tools.oras).args([
            "push".to_string(),
            self.bundle_tag.clone(),
            format!("{}:{BUNDLE_MEDIA_TYPE}", display_path(&self.bundle_path)),
        ])
    }
}

#[async_trait]
impl Task for BundlePublishTask {
    fn name(&self) -> &'static str {
        "bundle-publish"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.bundle_tag, "bundle tag required");
        errors.require(&display_path(&self.bundle_path), "bundle path required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let options = ctx
            .run_options(self.name())
            .stdout(StdoutTarget::Lines(stderr.clone()))
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.command(&ctx.tools), options, &ctx.cancel)
            .await
            .into_result(self.name())
    }
}

/// `gatecheck validate` against the bundle.
#[derive(Debug, Clone)]
pub struct ValidateTask {
    target: PathBuf,
    config_file: Option<PathBuf>,
}

impl ValidateTask {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        let task = Self::new(options.artifact_path(&options.bundle_filename));
        if options.gatecheck_config_filename.trim().is_empty() {
            task
        } else {
            task.with_config_file(&options.gatecheck_config_filename)
        }
    }

    fn command(&self, tools: &ToolPaths) -> CommandSpec {
        let mut command = CommandSpec::new(&tools.gatecheck).arg("validate");
        if let Some(config) = &self.config_file {
            command = command.arg("--config").arg(display_path(config));
        }
        command.arg(display_path(&self.target))
    }
}

#[async_trait]
impl Task for ValidateTask {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&display_path(&self.target), "validation target required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let options = ctx
            .run_options(self.name())
            .stdout(StdoutTarget::Sink(ctx.display.clone()))
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.command(&ctx.tools), options, &ctx.cancel)
            .await
            .into_result(self.name())
    }
}
