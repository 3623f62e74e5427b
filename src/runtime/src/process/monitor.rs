//! Periodic file-size progress reporting.

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::sink::Sink;

/// Shortest polling interval accepted by [`FileMonitor::spawn`].
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Background task that reports a file's size whenever it changes.
///
/// Each report is one line: `[label] <path>: <size>`.
pub struct FileMonitor {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl FileMonitor {
    /// Start polling `path` every `interval`. The monitor also stops when
    /// `cancel` fires.
    pub fn spawn(
        path: impl Into<PathBuf>,
        interval: Duration,
        sink: Sink,
        label: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Self {
        let path = path.into();
        let label = label.into();
        let stop = cancel.child_token();
        let token = stop.clone();
        let interval = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<u64> = None;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Ok(metadata) = tokio::fs::metadata(&path).await else {
                            continue;
                        };
                        let size = metadata.len();
                        if last == Some(size) {
                            continue;
                        }
                        last = Some(size);
                        let line = format!("{}: {}", path.display(), format_bytes(size));
                        if let Err(e) = sink.write_labelled(&label, line.as_bytes()) {
                            tracing::warn!(label = %label, error = %e, "Failed to write progress");
                            break;
                        }
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Stop polling and wait for the background task to finish.
    pub async fn stop(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
