//! `sast-code-scan`: semgrep (or osemgrep) in CI mode.

use std::path::PathBuf;

use async_trait::async_trait;

use wfe_core::{Result, ValidationErrors};

use super::gatecheck::list_report;
use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, ToolPaths};

#[derive(Debug, Clone)]
pub struct SastScanTask {
    rules: String,
    report_path: PathBuf,
    experimental: bool,
}

impl SastScanTask {
    pub fn new(rules: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            rules: rules.into(),
            report_path: report_path.into(),
            experimental: false,
        }
    }

    /// Use osemgrep with `--experimental`.
    pub fn with_experimental(mut self, experimental: bool) -> Self {
        self.experimental = experimental;
        self
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.semgrep_rules,
            options.artifact_path(&options.semgrep_filename),
        )
        .with_experimental(options.semgrep_experimental)
    }

    fn command(&self, tools: &ToolPaths) -> CommandSpec {
        if self.experimental {
            CommandSpec::new(&tools.osemgrep)
                .args(["ci", "--json", "--experimental", "--config"])
                .arg(&self.rules)
        } else {
            CommandSpec::new(&tools.semgrep)
                .args(["ci", "--json", "--config"])
                .arg(&self.rules)
        }
    }
}

#[async_trait]
impl Task for SastScanTask {
    fn name(&self) -> &'static str {
        "sast-code-scan"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.rules, "semgrep rules required");
        errors.require(&display_path(&self.report_path), "semgrep report path required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        let stdout = ctx.artifact_output(&self.report_path)?;
        let options = ctx
            .run_options("semgrep")
            .stdout(stdout)
            .stderr(StderrTarget::Sink(stderr.clone()));
        let code = run(&self.command(&ctx.tools), options, &ctx.cancel).await;

        if let Err(e) = code.into_result("semgrep") {
            if !ctx.dry_run {
                if let Err(remove) = std::fs::remove_file(&self.report_path) {
                    tracing::warn!(
                        path = %self.report_path.display(),
                        error = %remove,
                        "Failed to remove semgrep report"
                    );
                }
            }
            return Err(e);
        }

        list_report(ctx, stderr, &self.report_path).await
    }
}
