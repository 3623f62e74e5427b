//! Shared line sinks.
//!
//! Every child process writes into a [`Sink`]; a write holds the sink lock
//! for exactly one line, so lines from concurrent children never interleave.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cloneable, lock-protected writer.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Sink {
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Discards everything.
    pub fn null() -> Self {
        Self::from_writer(io::sink())
    }

    /// A sink backed by an in-memory buffer, plus a handle to read it back.
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::from_writer(buffer.clone()), buffer)
    }

    /// Write `bytes` and flush, as one atomic unit.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(bytes)?;
        writer.flush()
    }

    /// Write `line` followed by a newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.write_all(&buf)
    }

    /// Write a line prefixed with `[label] `.
    ///
    /// The line is assembled first and handed to the writer in one call, so
    /// writers sharing the same file descriptor (the log subscriber on
    /// stderr) cannot split it.
    pub fn write_labelled(&self, label: &str, line: &[u8]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(label.len() + line.len() + 4);
        buf.push(b'[');
        buf.extend_from_slice(label.as_bytes());
        buf.extend_from_slice(b"] ");
        buf.extend_from_slice(line);
        buf.push(b'\n');
        self.write_all(&buf)
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

/// In-memory writer whose contents stay readable after clones are handed out.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
