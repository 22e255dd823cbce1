//! The working-directory lock file.
//!
//! Presence of `<working_dir>/lock` means another invocation is running
//! against the same configuration. The file is created with an atomic
//! create-if-absent open, so two starters cannot both succeed, and holds a
//! small record of who created it. A lock left behind by a killed process is
//! never removed automatically.
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EmbalmError;

/// File name of the lock inside the working directory.
pub const LOCK_FILE: &str = "lock";

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// When the locking invocation started.
    pub started: toml::value::Datetime,
    /// Process id of the locking invocation.
    pub pid: u32,
}

impl LockRecord {
    /// Record for the current process, started now.
    ///
    /// # Errors
    ///
    /// Returns an error if the current time cannot be represented.
    pub fn current() -> Result<Self, toml::value::DatetimeParseError> {
        let started = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
        Ok(Self {
            started: started.parse()?,
            pid: std::process::id(),
        })
    }
}

/// A held lock; dropping it removes the lock file.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    released: bool,
}

impl LockFile {
    /// Create the lock file at `path`.
    ///
    /// # Errors
    ///
    /// - [`EmbalmError::Busy`] if the file already exists
    /// - [`EmbalmError::Io`] if it cannot be created or written
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, EmbalmError> {
        let path = path.into();
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if let Some(holder) = read_record(&path) {
                    tracing::debug!("lock held by pid {} since {}", holder.pid, holder.started);
                }
                return Err(EmbalmError::Busy { lockfile: path });
            }
            Err(e) => return Err(EmbalmError::io(&path, e)),
        };
        // From here on the file is ours; remove it again if the record cannot be written.
        let lock = Self {
            path,
            released: false,
        };

        let record = LockRecord::current()
            .map_err(|e| e.to_string())
            .and_then(|r| toml::to_string(&r).map_err(|e| e.to_string()))
            .map_err(|e| {
                EmbalmError::io(&lock.path, Error::new(ErrorKind::InvalidData, e))
            })?;
        file.write_all(record.as_bytes())
            .map_err(|e| EmbalmError::io(&lock.path, e))?;
        tracing::debug!("lock acquired: {}", lock.path.display());
        Ok(lock)
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file now.
    ///
    /// # Errors
    ///
    /// Returns [`EmbalmError::Io`] if the file cannot be removed.
    pub fn release(mut self) -> Result<(), EmbalmError> {
        self.released = true;
        remove(&self.path)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove(&self.path) {
            tracing::warn!("could not release lock: {e}");
        }
    }
}

fn remove(path: &Path) -> Result<(), EmbalmError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("lock released: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EmbalmError::io(path, e)),
    }
}

/// Read the record of an existing lock file.
///
/// Returns `None` if the file is missing or does not hold a record.
#[must_use]
pub fn read_record(path: &Path) -> Option<LockRecord> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        {
            let lock = LockFile::acquire(&path).unwrap();
            assert!(lock.path().exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_is_busy() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let _held = LockFile::acquire(&path).unwrap();
        let err = LockFile::acquire(&path).unwrap_err();
        assert!(matches!(err, EmbalmError::Busy { ref lockfile } if lockfile == &path));
    }

    #[test]
    fn stale_lock_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        fs::write(&path, "started = 2020-01-01T00:00:00Z\npid = 1\n").unwrap();
        assert!(LockFile::acquire(&path).is_err());
        assert!(path.exists(), "a busy lock must not be removed");
        assert_eq!(read_record(&path).unwrap().pid, 1);
    }

    #[test]
    fn lock_without_a_record_is_still_busy() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        fs::write(&path, "").unwrap();
        assert!(read_record(&path).is_none());
        assert!(matches!(
            LockFile::acquire(&path).unwrap_err(),
            EmbalmError::Busy { .. }
        ));
        assert!(path.exists());
    }

    #[test]
    fn record_names_this_process() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        let _held = LockFile::acquire(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("started = "), "{content}");
        assert!(!content.contains('"'), "timestamp should be unquoted: {content}");
        let record = read_record(&path).unwrap();
        assert_eq!(record.pid, std::process::id());
    }

    #[test]
    fn explicit_release() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        LockFile::acquire(&path).unwrap().release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent").join(LOCK_FILE);
        assert!(matches!(
            LockFile::acquire(&path).unwrap_err(),
            EmbalmError::Io { .. }
        ));
    }
}
