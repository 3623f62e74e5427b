//! Task catalog.
//!
//! Each task validates its options, then drives one or more external tools
//! through the process runner. Child stderr is streamed line-labelled to the
//! caller's stderr sink; human-readable summaries go to the display sink.

mod build;
mod clamav;
mod code_scan;
mod gatecheck;
mod gitleaks;
mod grype;
mod options;
mod push;
mod save;
mod semgrep;

use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use wfe_core::{PipelineError, Result};

use crate::process::{RunOptions, Sink, StdoutTarget, ToolPaths};

pub use build::{build_command, CliInterface, ImageBuildTask};
pub use clamav::ImageAntivirusTask;
pub use code_scan::CodeScanTask;
pub use gatecheck::{BundlePublishTask, BundleTask, ValidateTask, BUNDLE_MEDIA_TYPE};
pub use gitleaks::SecretsScanTask;
pub use grype::ImageVulScanTask;
pub use options::{ImageBuildOptions, TaskOptions};
pub use push::ImagePushTask;
pub use save::ImageSaveTask;
pub use semgrep::SastScanTask;

/// One named unit of work.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check every required option, reporting all problems together.
    fn validate(&self) -> Result<()>;

    /// Drive the task's children. Called only after [`Task::validate`] passed.
    async fn execute(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()>;

    /// Validate, then execute.
    async fn run(&self, ctx: &TaskContext, stderr: &Sink) -> Result<()> {
        self.validate()?;
        tracing::info!(task = self.name(), dry_run = ctx.dry_run, "Running task");
        let result = self.execute(ctx, stderr).await;
        match &result {
            Ok(()) => tracing::info!(task = self.name(), "Task completed"),
            Err(e) => tracing::debug!(task = self.name(), error = %e, "Task failed"),
        }
        result
    }
}

/// Everything a task needs from its caller.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub cancel: CancellationToken,
    pub dry_run: bool,
    /// Destination of human-readable output (stdout by default).
    pub display: Sink,
    pub tools: ToolPaths,
    /// Deadline timer set by [`TaskContext::with_timeout`], shared by clones.
    deadline: Option<Arc<DeadlineGuard>>,
}

/// Aborts the deadline timer once the last context holding it is dropped.
/// An enclosing deadline stays alive as long as any nested one does.
#[derive(Debug)]
struct DeadlineGuard {
    timer: tokio::task::AbortHandle,
    _outer: Option<Arc<DeadlineGuard>>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

impl TaskContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            dry_run: false,
            display: Sink::stdout(),
            tools: ToolPaths::default(),
            deadline: None,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_display(mut self, display: Sink) -> Self {
        self.display = display;
        self
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// A copy whose token is additionally cancelled after `timeout`.
    ///
    /// The timer lives as long as the returned context (or one of its clones).
    /// Must be called from within a Tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let token = self.cancel.child_token();
        let deadline = token.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Task deadline reached");
                    deadline.cancel();
                }
                _ = deadline.cancelled() => {}
            }
        });
        Self {
            cancel: token,
            deadline: Some(Arc::new(DeadlineGuard {
                timer: timer.abort_handle(),
                _outer: self.deadline.clone(),
            })),
            ..self.clone()
        }
    }

    /// Runner options for one child, carrying the dry-run flag.
    pub(crate) fn run_options(&self, label: &str) -> RunOptions {
        RunOptions::new(label).dry_run(self.dry_run)
    }

    /// Open an artifact file for a child's stdout (write, create, truncate).
    ///
    /// Dry runs leave the filesystem untouched.
    pub(crate) fn artifact_output(&self, path: &Path) -> Result<StdoutTarget> {
        if self.dry_run {
            return Ok(StdoutTarget::Null);
        }
        ensure_parent(path)?;
        Ok(StdoutTarget::File(File::create(path)?))
    }

    /// Make sure the directory a child will write `path` into exists.
    pub(crate) fn prepare_artifact(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        ensure_parent(path)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Names accepted by `run-task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ImageBuild,
    ImageSave,
    ImageVulScan,
    ImageAntivirusScan,
    ImagePush,
    SastCodeScan,
    SecretsCodeScan,
    CodeScan,
    Bundle,
    BundlePublish,
    Validate,
}

impl TaskKind {
    pub const ALL: [TaskKind; 11] = [
        TaskKind::ImageBuild,
        TaskKind::ImageSave,
        TaskKind::ImageVulScan,
        TaskKind::ImageAntivirusScan,
        TaskKind::ImagePush,
        TaskKind::SastCodeScan,
        TaskKind::SecretsCodeScan,
        TaskKind::CodeScan,
        TaskKind::Bundle,
        TaskKind::BundlePublish,
        TaskKind::Validate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ImageBuild => "image-build",
            TaskKind::ImageSave => "image-save",
            TaskKind::ImageVulScan => "image-vul-scan",
            TaskKind::ImageAntivirusScan => "image-antivirus-scan",
            TaskKind::ImagePush => "image-push",
            TaskKind::SastCodeScan => "sast-code-scan",
            TaskKind::SecretsCodeScan => "secrets-code-scan",
            TaskKind::CodeScan => "code-scan",
            TaskKind::Bundle => "bundle",
            TaskKind::BundlePublish => "bundle-publish",
            TaskKind::Validate => "validate",
        }
    }

    /// Construct the task from resolved options.
    pub fn build(&self, options: &TaskOptions) -> Box<dyn Task> {
        match self {
            TaskKind::ImageBuild => Box::new(ImageBuildTask::from_options(options)),
            TaskKind::ImageSave => Box::new(ImageSaveTask::from_options(options)),
            TaskKind::ImageVulScan => Box::new(ImageVulScanTask::from_options(options)),
            TaskKind::ImageAntivirusScan => Box::new(ImageAntivirusTask::from_options(options)),
            TaskKind::ImagePush => Box::new(ImagePushTask::from_options(options)),
            TaskKind::SastCodeScan => Box::new(SastScanTask::from_options(options)),
            TaskKind::SecretsCodeScan => Box::new(SecretsScanTask::from_options(options)),
            TaskKind::CodeScan => Box::new(CodeScanTask::from_options(options)),
            TaskKind::Bundle => Box::new(BundleTask::from_options(options)),
            TaskKind::BundlePublish => Box::new(BundlePublishTask::from_options(options)),
            TaskKind::Validate => Box::new(ValidateTask::from_options(options)),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = TaskKind::ALL.iter().map(|k| k.as_str()).collect();
                PipelineError::Configuration(format!(
                    "unknown task '{s}' (available: {})",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfe_core::Config;

    #[test]
    fn test_task_kind_round_trips_names() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_task_is_configuration_error() {
        let err = "image-scan-everything".parse::<TaskKind>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("image-build"));
    }

    #[test]
    fn test_built_task_names_match_kinds() {
        let options = TaskOptions::from_config(&Config::default());
        for kind in TaskKind::ALL {
            assert_eq!(kind.build(&options).name(), kind.as_str());
        }
    }

    #[tokio::test]
    async fn test_with_timeout_cancels_child_token_only() {
        let ctx = TaskContext::new(CancellationToken::new());
        let timed = ctx.with_timeout(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(1), timed.cancel.cancelled())
            .await
            .unwrap();
        assert!(!ctx.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropping_timed_context_stops_deadline() {
        let ctx = TaskContext::new(CancellationToken::new());
        let timed = ctx.with_timeout(Duration::from_millis(50));
        let token = timed.cancel.clone();
        let clone = timed.clone();
        drop(timed);
        drop(clone);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_timed_context() {
        let ctx = TaskContext::new(CancellationToken::new());
        let timed = ctx.with_timeout(Duration::from_secs(60));
        ctx.cancel.cancel();
        assert!(timed.cancel.is_cancelled());
    }

    #[test]
    fn test_dry_run_artifact_output_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let ctx = TaskContext::new(CancellationToken::new()).with_dry_run(true);
        assert!(matches!(
            ctx.artifact_output(&path).unwrap(),
            StdoutTarget::Null
        ));
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn test_artifact_output_creates_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();
        let ctx = TaskContext::new(CancellationToken::new());
        assert!(matches!(
            ctx.artifact_output(&path).unwrap(),
            StdoutTarget::File(_)
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
