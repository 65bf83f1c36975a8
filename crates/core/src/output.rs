//! Line-oriented output sinks for phase processes
//!
//! Each line is written and flushed under one lock, so lines from concurrent
//! writers never interleave mid-line. Nothing is buffered across lines.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// A destination for whole lines, optionally prefixed with `[<name>] `
#[derive(Clone)]
pub struct LineSink {
    writer: SharedWriter,
    prefix: Option<String>,
}

impl LineSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            prefix: None,
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    /// Same destination, every line prefixed with `[<name>] `
    ///
    /// Replaces any existing prefix rather than stacking it.
    pub fn with_prefix(&self, name: &str) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            prefix: Some(format!("[{}] ", name)),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Write one line; trailing CR/LF in `line` is normalized to a single newline
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))?;
        if let Some(prefix) = &self.prefix {
            writer.write_all(prefix.as_bytes())?;
        }
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl std::fmt::Debug for LineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSink")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Pair of sinks phase output is written to
#[derive(Debug, Clone)]
pub struct PhaseLogger {
    stdout: LineSink,
    stderr: LineSink,
}

impl PhaseLogger {
    pub fn new(stdout: LineSink, stderr: LineSink) -> Self {
        Self { stdout, stderr }
    }

    /// Process stdout/stderr
    pub fn stdio() -> Self {
        Self::new(LineSink::stdout(), LineSink::stderr())
    }

    pub fn discard() -> Self {
        Self::new(LineSink::discard(), LineSink::discard())
    }

    /// Sinks for one phase, both prefixed with the phase name
    pub fn for_phase(&self, name: &str) -> (LineSink, LineSink) {
        (self.stdout.with_prefix(name), self.stderr.with_prefix(name))
    }
}

impl Default for PhaseLogger {
    fn default() -> Self {
        Self::stdio()
    }
}

/// In-memory writer whose clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
