//! Child process runner.
//!
//! [`run`] starts one external program, wires its streams, waits for it and
//! classifies the outcome as an [`ExitCode`]. Cancelling the token terminates
//! the child.

use std::fmt;
use std::fs::File;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wfe_core::ExitCode;

use super::sink::Sink;
use super::stream::copy_lines;

/// How long output copiers may keep draining after the child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Where the child's stdin comes from.
#[derive(Debug, Default)]
pub enum StdinSource {
    Inherit,
    #[default]
    Null,
    File(File),
}

/// Where the child's stdout goes.
#[derive(Debug, Default)]
pub enum StdoutTarget {
    Inherit,
    #[default]
    Null,
    File(File),
    /// Raw bytes, unlabelled.
    Sink(Sink),
    /// One `[label] ` prefixed line at a time.
    Lines(Sink),
}

/// Where the child's stderr goes.
#[derive(Debug, Default)]
pub enum StderrTarget {
    #[default]
    Inherit,
    Null,
    /// One `[label] ` prefixed line at a time.
    Sink(Sink),
}

/// Per-invocation options.
#[derive(Debug, Default)]
pub struct RunOptions {
    label: String,
    dry_run: bool,
    stdin: StdinSource,
    stdout: StdoutTarget,
    stderr: StderrTarget,
}

impl RunOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn stdout(mut self, stdout: StdoutTarget) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn stderr(mut self, stderr: StderrTarget) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Run `command` to completion.
///
/// A dry run logs the command line and returns [`ExitCode::Ok`] without
/// starting anything. An empty program name is [`ExitCode::BadConfiguration`].
pub async fn run(command: &CommandSpec, options: RunOptions, cancel: &CancellationToken) -> ExitCode {
    let RunOptions {
        label,
        dry_run,
        stdin,
        stdout,
        stderr,
    } = options;

    if command.program().trim().is_empty() {
        tracing::error!(label = %label, "No program configured for child process");
        return ExitCode::BadConfiguration;
    }

    if dry_run {
        tracing::info!(label = %label, command = %command, "Dry run, child process not started");
        return ExitCode::Ok;
    }

    if cancel.is_cancelled() {
        tracing::warn!(label = %label, "Canceled before child process started");
        return ExitCode::ContextCancel;
    }

    let mut cmd = Command::new(command.program());
    cmd.args(command.arguments()).kill_on_drop(true);

    cmd.stdin(match stdin {
        StdinSource::Inherit => Stdio::inherit(),
        StdinSource::Null => Stdio::null(),
        StdinSource::File(file) => Stdio::from(file),
    });

    let stdout_copy = match stdout {
        StdoutTarget::Inherit => {
            cmd.stdout(Stdio::inherit());
            None
        }
        StdoutTarget::Null => {
            cmd.stdout(Stdio::null());
            None
        }
        StdoutTarget::File(file) => {
            cmd.stdout(Stdio::from(file));
            None
        }
        StdoutTarget::Sink(sink) => {
            cmd.stdout(Stdio::piped());
            Some((sink, false))
        }
        StdoutTarget::Lines(sink) => {
            cmd.stdout(Stdio::piped());
            Some((sink, true))
        }
    };

    let stderr_copy = match stderr {
        StderrTarget::Inherit => {
            cmd.stderr(Stdio::inherit());
            None
        }
        StderrTarget::Null => {
            cmd.stderr(Stdio::null());
            None
        }
        StderrTarget::Sink(sink) => {
            cmd.stderr(Stdio::piped());
            Some(sink)
        }
    };

    tracing::debug!(label = %label, command = %command, "Starting child process");

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(
                label = %label,
                program = command.program(),
                error = %e,
                "Failed to start child process"
            );
            return ExitCode::Unknown;
        }
    };

    let mut copiers: Vec<JoinHandle<()>> = Vec::new();
    if let (Some(pipe), Some((sink, labelled))) = (child.stdout.take(), stdout_copy) {
        copiers.push(spawn_copier(pipe, sink, label.clone(), labelled));
    }
    if let (Some(pipe), Some(sink)) = (child.stderr.take(), stderr_copy) {
        copiers.push(spawn_copier(pipe, sink, label.clone(), true));
    }

    let code = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => match status.code() {
                Some(code) => ExitCode::from_child(code),
                None => {
                    tracing::warn!(label = %label, "Child process terminated without an exit code");
                    ExitCode::Unknown
                }
            },
            Err(e) => {
                tracing::error!(label = %label, error = %e, "Failed to wait for child process");
                ExitCode::Unknown
            }
        },
        _ = cancel.cancelled() => match child.start_kill() {
            Ok(()) => {
                let _ = child.wait().await;
                tracing::warn!(label = %label, "Child process terminated by cancellation");
                ExitCode::ContextCancel
            }
            Err(e) => {
                tracing::error!(label = %label, error = %e, "Failed to terminate child process");
                ExitCode::KillFailure
            }
        },
    };

    match code {
        // A grandchild holding the pipe open must not outlive cancellation.
        ExitCode::Ok | ExitCode::Child(_) => {
            for mut copier in copiers {
                tokio::select! {
                    _ = &mut copier => {}
                    _ = cancel.cancelled() => {
                        if tokio::time::timeout(DRAIN_GRACE, &mut copier).await.is_err() {
                            tracing::warn!(label = %label, "Child output still open after cancellation, dropping it");
                            copier.abort();
                        }
                    }
                }
            }
        }
        _ => {
            for mut copier in copiers {
                if tokio::time::timeout(DRAIN_GRACE, &mut copier).await.is_err() {
                    copier.abort();
                }
            }
        }
    }

    tracing::debug!(label = %label, exit = %code, "Child process finished");
    code
}

fn spawn_copier<R>(pipe: R, sink: Sink, label: String, labelled: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let result = if labelled {
            copy_lines(pipe, &sink, &label).await.map(|_| ())
        } else {
            copy_raw(pipe, &sink).await
        };
        if let Err(e) = result {
            tracing::warn!(label = %label, error = %e, "Failed to copy child output");
        }
    })
}

async fn copy_raw<R: AsyncRead + Unpin>(mut pipe: R, sink: &Sink) -> std::io::Result<()> {
    let mut buf = vec![0u8; 8192];
    loop {
        let n = pipe.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..n])?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let command = CommandSpec::new("docker").args(["save", "app:1"]);
        assert_eq!(command.to_string(), "docker save app:1");
        assert_eq!(command.program(), "docker");
        assert_eq!(command.arguments(), ["save", "app:1"]);
    }

    #[tokio::test]
    async fn test_empty_program_is_bad_configuration() {
        let code = run(
            &CommandSpec::new(""),
            RunOptions::new("empty"),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(code, ExitCode::BadConfiguration);
    }

    #[tokio::test]
    async fn test_missing_program_is_unknown() {
        let code = run(
            &CommandSpec::new("wfe-definitely-not-installed"),
            RunOptions::new("missing"),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(code, ExitCode::Unknown);
        assert_eq!(code.code(), 232);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let command = CommandSpec::new("touch").arg(marker.to_string_lossy());
        let code = run(
            &command,
            RunOptions::new("touch").dry_run(true),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(code, ExitCode::Ok);
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_exit_code_is_propagated() {
        let command = CommandSpec::new("sh").args(["-c", "exit 7"]);
        let code = run(&command, RunOptions::new("sh"), &CancellationToken::new()).await;
        assert_eq!(code, ExitCode::Child(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_terminates_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let code = run(
            &CommandSpec::new("sleep").arg("5"),
            RunOptions::new("sleep"),
            &cancel,
        )
        .await;
        assert_eq!(code, ExitCode::ContextCancel);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_stops_draining_inherited_pipe() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let (sink, buffer) = Sink::buffer();
        let started = std::time::Instant::now();
        let code = run(
            &CommandSpec::new("sh").args(["-c", "sleep 4 & echo started >&2; exit 0"]),
            RunOptions::new("bg").stderr(StderrTarget::Sink(sink)),
            &cancel,
        )
        .await;
        assert_eq!(code, ExitCode::Ok);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(buffer.to_string_lossy(), "[bg] started\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let code = run(&CommandSpec::new("true"), RunOptions::new("true"), &cancel).await;
        assert_eq!(code, ExitCode::ContextCancel);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_to_file_and_stdin_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, "payload\n").unwrap();

        let code = run(
            &CommandSpec::new("cat"),
            RunOptions::new("cat")
                .stdin(StdinSource::File(File::open(&input).unwrap()))
                .stdout(StdoutTarget::File(File::create(&output).unwrap())),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(code, ExitCode::Ok);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "payload\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_sink_modes() {
        let (raw, raw_buffer) = Sink::buffer();
        let command = CommandSpec::new("sh").args(["-c", "printf 'a\\nb\\n'"]);
        let code = run(
            &command,
            RunOptions::new("raw").stdout(StdoutTarget::Sink(raw)),
            &CancellationToken::new(),
        )
        .await;
        assert!(code.is_ok());
        assert_eq!(raw_buffer.to_string_lossy(), "a\nb\n");

        let (lines, lines_buffer) = Sink::buffer();
        let code = run(
            &command,
            RunOptions::new("build").stdout(StdoutTarget::Lines(lines)),
            &CancellationToken::new(),
        )
        .await;
        assert!(code.is_ok());
        assert_eq!(lines_buffer.to_string_lossy(), "[build] a\n[build] b\n");
    }
}
