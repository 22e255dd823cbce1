//! The scoped execution context of a command.
//!
//! [`ExecutionContext::enter`] prepares everything a command needs: the
//! working directory exists and is the current directory, every auxiliary
//! path is resolved, the lock is held if the command needs exclusive access,
//! and the run log is open. Dropping the context undoes all of it, on every
//! exit path: success, error or interruption.
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::locations::absolute;
use crate::config::{Settings, WORKING_DIR_SETTING};
use crate::error::EmbalmError;
use crate::lock::{LOCK_FILE, LockFile};
use crate::logging::LogSink;

/// Archive cache directory, relative to the working directory.
pub const ARCHIVE_DIR: &str = "archives";
/// Restore target directory, relative to the working directory.
pub const RESTORE_DIR: &str = "restored";
/// Date stamp of the last incremental backup.
pub const LAST_INCREMENTAL: &str = "lastbackup_incr";
/// Date stamp of the last full backup.
pub const LAST_FULL: &str = "lastbackup_full";
/// Run log file name template.
pub const LOG_FILE: &str = "{prog_name}.log";

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub(crate) static CWD_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Resources held while a command runs.
#[derive(Debug)]
pub struct ExecutionContext {
    settings: Settings,
    starting_dir: PathBuf,
    working_dir: PathBuf,
    src_dir: PathBuf,
    dest_dir: String,
    archive_dir: PathBuf,
    restore_dir: PathBuf,
    lastbackup_incr: PathBuf,
    lastbackup_full: PathBuf,
    log_file: PathBuf,
    lock: Option<LockFile>,
    sink: LogSink,
}

impl ExecutionContext {
    /// Enter the working directory of `settings`.
    ///
    /// # Errors
    ///
    /// - [`EmbalmError::Config`] if a path setting cannot be resolved
    /// - [`EmbalmError::Io`] if the working directory cannot be created or entered
    /// - [`EmbalmError::Busy`] if `exclusive` and the lock is already held
    pub fn enter(settings: Settings, exclusive: bool, sink: &LogSink) -> Result<Self, EmbalmError> {
        let starting_dir = std::env::current_dir().map_err(|e| EmbalmError::io(".", e))?;
        let working_dir = absolute(&settings.require_value(WORKING_DIR_SETTING)?, &starting_dir);
        let src_dir = absolute(&settings.require_value("src_dir")?, &starting_dir);
        let dest_dir = settings.require_value("dest_dir")?;
        let in_working_dir = |name: &str| -> Result<PathBuf, EmbalmError> {
            Ok(working_dir.join(settings.resolve(name)?))
        };
        let archive_dir = in_working_dir(ARCHIVE_DIR)?;
        let restore_dir = in_working_dir(RESTORE_DIR)?;
        let lastbackup_incr = in_working_dir(LAST_INCREMENTAL)?;
        let lastbackup_full = in_working_dir(LAST_FULL)?;
        let log_file = in_working_dir(LOG_FILE)?;

        fs::create_dir_all(&working_dir).map_err(|e| EmbalmError::io(&working_dir, e))?;
        std::env::set_current_dir(&working_dir).map_err(|e| EmbalmError::io(&working_dir, e))?;
        tracing::debug!("working directory: {}", working_dir.display());

        // From here on, dropping `ctx` restores the starting directory.
        let mut ctx = Self {
            settings,
            starting_dir,
            working_dir,
            src_dir,
            dest_dir,
            archive_dir,
            restore_dir,
            lastbackup_incr,
            lastbackup_full,
            log_file,
            lock: None,
            sink: sink.clone(),
        };

        if exclusive {
            ctx.lock = Some(LockFile::acquire(ctx.lock_file())?);
        }
        ctx.sink.open(&ctx.log_file)?;
        Ok(ctx)
    }

    /// The settings of the active configuration.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The directory the process was started in.
    #[must_use]
    pub fn starting_dir(&self) -> &Path {
        &self.starting_dir
    }

    /// The working directory (also the current directory while the context lives).
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Local directory being backed up.
    #[must_use]
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Directory on the backup server.
    #[must_use]
    pub fn dest_dir(&self) -> &str {
        &self.dest_dir
    }

    /// Directory holding the settings files.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.settings.config_dir()
    }

    /// Duplicity's archive cache.
    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Where restored files are placed.
    #[must_use]
    pub fn restore_dir(&self) -> &Path {
        &self.restore_dir
    }

    /// Date stamp of the last incremental backup.
    #[must_use]
    pub fn lastbackup_incr(&self) -> &Path {
        &self.lastbackup_incr
    }

    /// Date stamp of the last full backup.
    #[must_use]
    pub fn lastbackup_full(&self) -> &Path {
        &self.lastbackup_full
    }

    /// The run log.
    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Path of the lock file, whether or not it is held.
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.working_dir.join(LOCK_FILE)
    }

    /// Whether this context holds the lock.
    #[must_use]
    pub const fn holds_lock(&self) -> bool {
        self.lock.is_some()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take()
            && let Err(e) = lock.release()
        {
            tracing::warn!("could not release lock: {e}");
        }
        self.sink.close();
        if let Err(e) = std::env::set_current_dir(&self.starting_dir) {
            tracing::warn!("{}: {e}", self.starting_dir.display());
        }
    }
}
