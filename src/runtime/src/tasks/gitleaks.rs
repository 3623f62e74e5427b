//! `secrets-code-scan`: gitleaks over the source tree.

use std::path::PathBuf;

use async_trait::async_trait;

use wfe_core::{Result, ValidationErrors};

use super::gatecheck::list_report;
use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, StdoutTarget, ToolPaths};

#[derive(Debug, Clone)]
pub struct SecretsScanTask {
    source_dir: String,
    report_path: PathBuf,
}

impl SecretsScanTask {
    pub fn new(source_dir: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            report_path: report_path.into(),
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.gitleaks_src_dir,
            options.artifact_path(&options.gitleaks_filename),
        )
    }

    fn command(&self, tools: &ToolPaths) -> CommandSpec {
        CommandSpec::new(&tools.gitleaks).args([
            "detect".to_string(),
            "--exit-code".to_string(),
            "0".to_string(),
            "--verbose".to_string(),
            "--source".to_string(),
            self.source_dir.clone(),
            "--report-path".to_string(),
            display_path(&self.report_path),
        ])
    }
}

#[async_trait]
impl Task for SecretsScanTask {
    fn name(&self) -> &'static str {
        "secrets-code-scan"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.source_dir, "gitleaks source directory required");
        errors.require(&display_path(&self.report_path), "gitleaks report path required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        ctx.prepare_artifact(&self.report_path)?;
        let options = ctx
            .run_options("gitleaks")
            .stdout(StdoutTarget::Lines(stderr.clone()))
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.command(&ctx.tools), options, &ctx.cancel)
            .await
            .into_result("gitleaks")?;

        list_report(ctx, stderr, &self.report_path).await
    }
}
