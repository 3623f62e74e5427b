//! `image-vul-scan`: syft SBOM, then grype over the SBOM.

use std::path::PathBuf;

use async_trait::async_trait;

use wfe_core::{Result, ValidationErrors};

use super::options::{display_path, TaskOptions};
use super::{Task, TaskContext};
use crate::process::{run, CommandSpec, Sink, StderrTarget, ToolPaths};

#[derive(Debug, Clone)]
pub struct ImageVulScanTask {
    image: String,
    sbom_path: PathBuf,
    grype_path: PathBuf,
}

impl ImageVulScanTask {
    pub fn new(
        image: impl Into<String>,
        sbom_path: impl Into<PathBuf>,
        grype_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image: image.into(),
            sbom_path: sbom_path.into(),
            grype_path: grype_path.into(),
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        Self::new(
            &options.image_name,
            options.artifact_path(&options.sbom_filename),
            options.artifact_path(&options.grype_filename),
        )
    }

    fn syft_command(&self, tools: &ToolPaths) -> CommandSpec {
        CommandSpec::new(&tools.syft).args([
            "scan".to_string(),
            self.image.clone(),
            "--scope=squashed".to_string(),
            "-o".to_string(),
            format!("syft-json={}", display_path(&self.sbom_path)),
            "-vv".to_string(),
        ])
    }

    fn grype_command(&self, tools: &ToolPaths) -> CommandSpec {
        CommandSpec::new(&tools.grype).args([
            format!("sbom:{}", display_path(&self.sbom_path)),
            "-o".to_string(),
            format!("json={}", display_path(&self.grype_path)),
            "-vv".to_string(),
        ])
    }
}

#[async_trait]
impl Task for ImageVulScanTask {
    fn name(&self) -> &'static str {
        "image-vul-scan"
    }

    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.image, "image name required");
        errors.require(&display_path(&self.sbom_path), "SBOM report path required");
        errors.require(
            &display_path(&self.grype_path),
            "vulnerability report path required",
        );
        errors.into_result()
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        ctx.prepare_artifact(&self.sbom_path)?;
        ctx.prepare_artifact(&self.grype_path)?;

        let syft = ctx
            .run_options("syft")
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.syft_command(&ctx.tools), syft, &ctx.cancel)
            .await
            .into_result("syft")?;

        let grype = ctx
            .run_options("grype")
            .stderr(StderrTarget::Sink(stderr.clone()));
        run(&self.grype_command(&ctx.tools), grype, &ctx.cancel)
            .await
            .into_result("grype")
    }
}
