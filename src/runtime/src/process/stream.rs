//! Line-labelled streaming of child output.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use wfe_core::Result;

use super::runner::{run, CommandSpec, RunOptions, StderrTarget};
use super::sink::Sink;

/// Copy `reader` into `sink` one line at a time, each prefixed with `[label] `.
///
/// A final line without a trailing newline is still emitted. Returns the
/// number of lines written.
pub async fn copy_lines<R>(reader: R, sink: &Sink, label: &str) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(256);
    let mut count = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        sink.write_labelled(label, &line)?;
        count += 1;
    }

    Ok(count)
}

/// Run `command` with its stderr labelled into `sink`, returning its outcome.
pub async fn stream(
    command: &CommandSpec,
    sink: &Sink,
    label: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let options = RunOptions::new(label).stderr(StderrTarget::Sink(sink.clone()));
    run(command, options, cancel).await.into_result(label)
}
