//! Whole-file JSON record persistence.
//!
//! A [`RecordStore`] owns one JSON file. Reads take a shared advisory lock,
//! writes take an exclusive one and replace the file atomically (write to a
//! sibling temp file, then rename), so a reader never sees a half-written
//! record. The store does not interpret the record: any `Serialize` /
//! `DeserializeOwned` value round-trips, including an opaque
//! [`serde_json::Value`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::ErrorCode;
use crate::lock::{LockError, RecordLock};

/// Errors from reading or writing a stored record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no saved record at {}", .0.display())]
    Missing(PathBuf),

    #[error("record I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record at {} is not valid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Missing(_) => ErrorCode::RecordMissing,
            Self::Io { .. } => ErrorCode::RecordWriteFailed,
            Self::Json { .. } => ErrorCode::CorruptRecord,
            Self::Lock(err) => err.code(),
        }
    }
}

/// A single JSON record on disk, guarded by a sibling `.lock` file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl RecordStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            lock_timeout,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and deserialize the record.
    ///
    /// # Errors
    ///
    /// [`StoreError::Missing`] if nothing has been written yet, otherwise
    /// lock, I/O or JSON failures.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        self.read_optional()?
            .ok_or_else(|| StoreError::Missing(self.path.clone()))
    }

    /// Like [`read`](Self::read) but maps a missing file to `None`.
    ///
    /// # Errors
    ///
    /// Lock, I/O or JSON failures.
    pub fn read_optional<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        let _lock = RecordLock::shared(&self.lock_path(), self.lock_timeout)?;

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!(bytes = bytes.len(), "record read");
        Ok(Some(value))
    }

    /// Serialize `value` and replace the record.
    ///
    /// # Errors
    ///
    /// Lock, I/O or serialization failures. On error the previous record,
    /// if any, is left in place.
    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    pub fn write<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let _lock = RecordLock::exclusive(&self.lock_path(), self.lock_timeout)?;

        let tmp = self.sibling("tmp");
        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(bytes = bytes.len(), "record written");
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling("lock")
    }

    fn sibling(&self, ext: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(ext);
        self.path.with_file_name(name)
    }
}
