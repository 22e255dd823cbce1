//! The per-run log file.
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::utils::format_local_datetime;
use crate::error::EmbalmError;

#[derive(Debug, Default)]
struct SinkState {
    file: Option<File>,
    path: Option<PathBuf>,
    pending: Vec<String>,
    closed: bool,
}

/// Handle to the run log at `<working_dir>/embalm.log`.
///
/// Lines written before the file is known (settings loading, validation) are
/// buffered and replayed when [`LogSink::open`] is called. After
/// [`LogSink::close`] further lines are dropped. Cloning yields another handle
/// to the same sink.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    state: Arc<Mutex<SinkState>>,
}

impl LogSink {
    /// Create an unopened sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate `path`, write a run header and replay buffered lines.
    ///
    /// # Errors
    ///
    /// Returns [`EmbalmError::Io`] if the file cannot be written.
    pub fn open(&self, path: &Path) -> Result<(), EmbalmError> {
        let header = format!(
            "==========================================\n\
             {} {} {}\n\
             ==========================================\n",
            crate::PROGRAM_NAME,
            crate::version(),
            format_local_datetime(),
        );
        fs::write(path, header).map_err(|e| EmbalmError::io(path, e))?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| EmbalmError::io(path, e))?;

        let mut state = self.lock();
        for line in state.pending.drain(..) {
            writeln!(file, "{line}").map_err(|e| EmbalmError::io(path, e))?;
        }
        state.file = Some(file);
        state.path = Some(path.to_path_buf());
        state.closed = false;
        Ok(())
    }

    /// Append one line.
    pub fn write_line(&self, line: &str) {
        let mut state = self.lock();
        if let Some(file) = state.file.as_mut() {
            writeln!(file, "{line}").ok();
        } else if !state.closed {
            state.pending.push(line.to_string());
        }
    }

    /// Flush and close the file. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        if let Some(mut file) = state.file.take() {
            file.flush().ok();
        }
        state.pending.clear();
        state.closed = true;
    }

    /// Path of the open (or last opened) log file.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    /// Whether the file is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
