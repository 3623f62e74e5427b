//! `code-scan`: secrets and SAST scans in one task.

use async_trait::async_trait;

use wfe_core::{PipelineError, Result};

use super::gitleaks::SecretsScanTask;
use super::options::TaskOptions;
use super::semgrep::SastScanTask;
use super::{Task, TaskContext};
use crate::process::Sink;

/// Runs each enabled sub-scan in turn.
///
/// Sub-task display output is buffered and written to the real display only
/// after every sub-task finished; stderr streams live. A failing sub-task does
/// not stop the next one and all failures are returned together.
pub struct CodeScanTask {
    scans: Vec<Box<dyn Task>>,
}

impl CodeScanTask {
    pub fn new(scans: Vec<Box<dyn Task>>) -> Self {
        Self { scans }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        let mut scans: Vec<Box<dyn Task>> = Vec::new();
        if options.gitleaks_enabled {
            scans.push(Box::new(SecretsScanTask::from_options(options)));
        }
        if options.semgrep_enabled {
            scans.push(Box::new(SastScanTask::from_options(options)));
        }
        Self::new(scans)
    }
}

#[async_trait]
impl Task for CodeScanTask {
    fn name(&self) -> &'static str {
        "code-scan"
    }

    fn validate(&self) -> Result<()> {
        let errors = self
            .scans
            .iter()
            .filter_map(|scan| scan.validate().err())
            .collect();
        PipelineError::join(errors)
    }

    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        if self.scans.is_empty() {
            tracing::info!("All code scans disabled");
            return Ok(());
        }

        let mut buffers = Vec::with_capacity(self.scans.len());
        let mut errors = Vec::new();
        for scan in &self.scans {
            let (display, buffer) = Sink::buffer();
            let sub = ctx.clone().with_display(display);
            if let Err(e) = scan.execute(&sub, stderr).await {
                tracing::warn!(task = scan.name(), error = %e, "Code scan failed");
                errors.push(e);
            }
            buffers.push(buffer);
        }

        for buffer in buffers {
            ctx.display.write_all(&buffer.contents())?;
        }
        PipelineError::join(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ToolPaths;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_toggles_select_scans() {
        let mut options = TaskOptions::from_config(&wfe_core::Config::default());
        assert_eq!(CodeScanTask::from_options(&options).scans.len(), 2);
        options.semgrep_enabled = false;
        let task = CodeScanTask::from_options(&options);
        assert_eq!(task.scans.len(), 1);
        assert_eq!(task.scans[0].name(), "secrets-code-scan");
    }

    #[test]
    fn test_validation_joins_sub_tasks() {
        let task = CodeScanTask::new(vec![
            Box::new(SecretsScanTask::new("", "r.json")),
            Box::new(SastScanTask::new("", "s.json")),
        ]);
        let err = task.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Joined(ref e) if e.len() == 2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failures_are_joined_and_display_is_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let (display, buffer) = Sink::buffer();
        let tools = ToolPaths {
            gitleaks: "true".to_string(),
            semgrep: "false".to_string(),
            gatecheck: "echo".to_string(),
            ..Default::default()
        };
        let ctx = TaskContext::new(CancellationToken::new())
            .with_tools(tools)
            .with_display(display);

        let secrets = dir.path().join("secrets.json");
        let task = CodeScanTask::new(vec![
            Box::new(SecretsScanTask::new(".", &secrets)),
            Box::new(SastScanTask::new("p/default", dir.path().join("semgrep.json"))),
        ]);
        let err = task.run(&ctx, &Sink::null()).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(
            buffer.to_string_lossy(),
            format!("ls {}\n", secrets.display())
        );
    }

    #[tokio::test]
    async fn test_nothing_enabled_is_success() {
        let ctx = TaskContext::new(CancellationToken::new());
        CodeScanTask::new(Vec::new())
            .run(&ctx, &Sink::null())
            .await
            .unwrap();
    }
}
