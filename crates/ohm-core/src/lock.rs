//! Advisory file locks guarding record reads and replacements.
//!
//! Readers share a lock; a writer holds it alone. Acquisition polls
//! `try_lock_*` until the timeout, then fails with [`LockError::Timeout`].

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lock acquisition failures.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock timed out after {waited:?} at {}", .path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("lock I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::RecordWriteFailed,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

/// RAII advisory lock on a record's sidecar `.lock` file.
///
/// Released on drop.
#[derive(Debug)]
pub struct RecordLock {
    file: File,
    path: PathBuf,
    kind: LockKind,
}

impl RecordLock {
    /// Shared lock for reading a record.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] if a writer holds the lock past `timeout`.
    pub fn shared(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, LockKind::Shared)
    }

    /// Exclusive lock for replacing a record.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] if any other holder outlasts `timeout`.
    pub fn exclusive(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, LockKind::Exclusive)
    }

    fn acquire(path: &Path, timeout: Duration, kind: LockKind) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let start = Instant::now();
        loop {
            // std's inherent `File::try_lock_*` shadows fs2 on newer toolchains.
            let attempt = match kind {
                LockKind::Shared => FileExt::try_lock_shared(&file),
                LockKind::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            if attempt.is_ok() {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    kind,
                });
            }

            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::{LockError, LockKind, RecordLock};
    use crate::error::ErrorCode;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_millis(50);
    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn exclusive_lock_creates_parent_dirs() -> Result<(), LockError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(".ohm").join("graph.json.lock");
        let lock = RecordLock::exclusive(&path, WAIT)?;
        assert_eq!(lock.path(), path.as_path());
        assert_eq!(lock.kind(), LockKind::Exclusive);
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn exclusive_lock_times_out_when_held() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("timeout.lock");
        let _held = RecordLock::exclusive(&path, WAIT).expect("first lock");
        let err = RecordLock::exclusive(&path, SHORT).expect_err("must time out");

        assert!(matches!(err, LockError::Timeout { path: ref p, .. } if *p == path));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
    }

    #[test]
    fn shared_locks_coexist() -> Result<(), LockError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("share.lock");
        let _first = RecordLock::shared(&path, WAIT)?;
        let second = RecordLock::shared(&path, WAIT)?;
        assert_eq!(second.kind(), LockKind::Shared);
        Ok(())
    }

    #[test]
    fn writer_excludes_readers_until_dropped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("graph.lock");
        let writer = RecordLock::exclusive(&path, WAIT).expect("write lock");
        let err = RecordLock::shared(&path, SHORT).expect_err("reader must wait");
        assert!(matches!(err, LockError::Timeout { .. }));

        drop(writer);
        RecordLock::shared(&path, WAIT).expect("reader after release");
    }
}
