//! Console facade used by commands.
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Target of the events that mirror command output into the run log.
pub(super) const OUTPUT_TARGET: &str = "embalm::output";

/// Logger handed to commands.
///
/// `error`, `warn`, `info` and `narrate` go through [`tracing`], so they
/// reach both the console and the run log. [`Logger::output`] is the
/// command's own result (a listing, a report): it is written to standard
/// output, or to a buffer in tests, and recorded in the run log under
/// the `embalm::output` target, which the console layer skips.
pub struct Logger {
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a logger writing output to standard output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Create a logger writing output into a shared buffer.
    #[must_use]
    pub fn capturing() -> (Self, Captured) {
        let captured = Captured::default();
        let logger = Self {
            out: Mutex::new(Box::new(captured.clone())),
        };
        (logger, captured)
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a narration message (shown on the console only with `--narrate`;
    /// always written to the run log).
    pub fn narrate(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Write one line of command output.
    pub fn output(&self, line: &str) {
        tracing::info!(target: OUTPUT_TARGET, "{line}");
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}").ok();
        out.flush().ok();
    }
}

/// Buffer receiving the output of a [`Logger::capturing`] logger.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Captured {
    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
