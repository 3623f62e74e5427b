//! End-to-end task scenarios against stand-in tool scripts.
//!
//! Each external tool is replaced by a small `sh` script written into a
//! temporary directory, so these tests only run on unix.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wfe_core::{Config, PipelineError};
use wfe_runtime::tasks::{ImageSaveTask, ImageVulScanTask};
use wfe_runtime::{run_pipeline, PipelineKind, Sink, Task, TaskContext, ToolPaths};

fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// A syft stand-in that writes an empty SBOM wherever `-o syft-json=` points.
fn fake_syft(dir: &Path, exit: i32) -> String {
    script(
        dir,
        "syft",
        &format!(
            r#"for a in "$@"; do case "$a" in syft-json=*) echo '{{"artifacts":[]}}' > "${{a#syft-json=}}";; esac; done
echo "cataloging image" >&2
exit {exit}"#
        ),
    )
}

/// A grype stand-in that records each run in `marker`.
fn fake_grype(dir: &Path, marker: &Path) -> String {
    script(
        dir,
        "grype",
        &format!(
            r#"echo ran >> "{}"
for a in "$@"; do case "$a" in json=*) echo '{{"matches":[]}}' > "${{a#json=}}";; esac; done
echo "scanning sbom" >&2"#,
            marker.display()
        ),
    )
}

fn reports(dir: &Path) -> (PathBuf, PathBuf) {
    let artifacts = dir.join("artifacts");
    (
        artifacts.join("sbom.syft.json"),
        artifacts.join("image-scan.grype.json"),
    )
}

#[tokio::test]
async fn test_vulnerability_scan_runs_syft_then_grype() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("grype-ran");
    let tools = ToolPaths {
        syft: fake_syft(dir.path(), 0),
        grype: fake_grype(dir.path(), &marker),
        ..Default::default()
    };
    let (sbom, grype) = reports(dir.path());
    let (stderr, buffer) = Sink::buffer();
    let ctx = TaskContext::new(CancellationToken::new()).with_tools(tools);

    ImageVulScanTask::new("app:1", &sbom, &grype)
        .run(&ctx, &stderr)
        .await
        .unwrap();

    assert!(sbom.exists());
    assert!(grype.exists());
    assert!(marker.exists());
    assert_eq!(
        buffer.to_string_lossy(),
        "[syft] cataloging image\n[grype] scanning sbom\n"
    );
}

#[tokio::test]
async fn test_failed_syft_never_starts_grype() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("grype-ran");
    let tools = ToolPaths {
        syft: fake_syft(dir.path(), 2),
        grype: fake_grype(dir.path(), &marker),
        ..Default::default()
    };
    let (sbom, grype) = reports(dir.path());
    let ctx = TaskContext::new(CancellationToken::new()).with_tools(tools);

    let err = ImageVulScanTask::new("app:1", &sbom, &grype)
        .run(&ctx, &Sink::null())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ChildFailure { ref label, code: 2 } if label == "syft"));
    assert!(!marker.exists());
    assert!(!grype.exists());
}

#[tokio::test]
async fn test_deadline_cancels_running_task() {
    let dir = tempfile::tempdir().unwrap();
    let tools = ToolPaths {
        docker: script(dir.path(), "docker", "exec sleep 1"),
        ..Default::default()
    };
    let ctx = TaskContext::new(CancellationToken::new()).with_tools(tools);
    let timed = ctx.with_timeout(Duration::from_millis(10));

    let tar = dir.path().join("image.tar");
    let err = ImageSaveTask::new("docker", "app:1", &tar)
        .run(&timed, &Sink::null())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Canceled { .. }), "{err:?}");
    assert_eq!(err.exit_code(), Some(231));
    assert_eq!(std::fs::metadata(&tar).unwrap().len(), 0);
}

#[tokio::test]
async fn test_image_build_pipeline_builds_then_saves() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("docker.log");
    let docker = script(
        dir.path(),
        "docker",
        &format!(r#"echo "$*" >> "{}"; echo "step $1" >&2"#, log.display()),
    );
    let tools = ToolPaths {
        docker,
        ..Default::default()
    };

    let mut config = Config::default();
    config.image_tag = "app:9".to_string();
    config.artifact_dir = dir.path().join("artifacts").to_string_lossy().into_owned();
    config.image_build.build_dir = dir.path().to_string_lossy().into_owned();
    config.image_build.save_progress_interval = 0;

    let (stderr, buffer) = Sink::buffer();
    let ctx = TaskContext::new(CancellationToken::new()).with_tools(tools);
    run_pipeline(PipelineKind::ImageBuild, &config, &ctx, &stderr)
        .await
        .unwrap();

    let calls = std::fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("build --tag app:9 --file Dockerfile "));
    assert_eq!(calls[1], "save app:9");
    assert_eq!(
        buffer.to_string_lossy(),
        "[image-build] step build\n[image-save] step save\n"
    );
    assert!(dir.path().join("artifacts").join("image.tar").exists());
}
