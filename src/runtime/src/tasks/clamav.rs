//! `image-antivirus-scan`: freshclam, then clamscan.

use std::path::PathBuf;

use async_trait::async_trait;

use wfe_core::{Result, ValidationErrors};

use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, StdoutTarget, ToolPaths};

const CLAMSCAN_ARGS: [&str; 7] = [
    "--infected",
    "--recursive",
    "--archive-verbose",
    "--scan-archive=yes",
    "--max-filesize=1000M",
    "--max-scansize=1000M",
    "--stdout",
];

#[derive(Debug, Clone)]
pub struct ImageAntivirusTask {
    target: PathBuf,
    report_path: PathBuf,
    freshclam_disabled: bool,
}

impl ImageAntivirusTask {
    pub fn new(target: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            report_path: report_path.into(),
            freshclam_disabled: false,
        }
    }

    pub fn with_freshclam_disabled(mut self, disabled: bool) -> Self {
        self.freshclam_disabled = disabled;
        self
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            options.clamav_scan_target(),
            options.artifact_path(&options.clamav_filename),
        )
        .with_freshclam_disabled(options.freshclam_disabled)
    }

    fn clamscan_command(&self, tools: &ToolPaths) -> CommandSpec {
        CommandSpec::new(&tools.clamscan)
            .args(CLAMSCAN_ARGS)
            .arg(display_path(&self.target))
    }
}

#[async_trait]
impl Task for ImageAntivirusTask {
    fn name(&self) -> &'static str {
        "image-antivirus-scan"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&display_path(&self.target), "scan target required");
        errors.require(&display_path(&self.report_path), "antivirus report path required");
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        if self.freshclam_disabled {
            tracing::debug!("Virus definition update disabled");
        } else {
            let freshclam = ctx
                .run_options("freshclam")
                .stdout(StdoutTarget::Lines(stderr.clone()))
                .stderr(StderrTarget::Sink(stderr.clone()));
            let code = run(&CommandSpec::new(&ctx.tools.freshclam), freshclam, &ctx.cancel).await;
            if ctx.cancel.is_cancelled() {
                return code.into_result("freshclam");
            }
            if !code.is_ok() {
                tracing::warn!(exit = %code, "Virus definition update failed, scanning with the current database");
            }
        }

        let stdout = ctx.artifact_output(&self.report_path)?;
        let clamscan = ctx
            .run_options("clamscan")
            .stdout(stdout)
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.clamscan_command(&ctx.tools), clamscan, &ctx.cancel)
            .await
            .into_result("clamscan")
    }
}
