//! Advisory lock on the state folder.
//!
//! Invocations are expected not to overlap; the lock hardens against
//! accidental overlap by failing the second invocation fast instead of
//! letting it race on the record files.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

const LOCK_FILE: &str = ".lock";

/// Lock acquisition error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LockError {
    /// Another invocation holds the lock.
    #[error("another renewal invocation is already running (lock held at {path})")]
    AlreadyRunning {
        /// The lock file path.
        path: PathBuf,
    },

    /// The lock file could not be opened or locked.
    #[error("failed to acquire state lock {path}: {source}")]
    Io {
        /// The lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Exclusive advisory lock over the state folder, held until dropped.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
    path: PathBuf,
}

impl StateLock {
    /// Acquire the lock for `state_folder`, creating the folder if needed.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyRunning` without retrying when the lock is
    /// held by another process, and `LockError::Io` on any other failure.
    pub fn acquire(state_folder: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(state_folder).map_err(|source| LockError::Io {
            path: state_folder.to_path_buf(),
            source,
        })?;
        let path = state_folder.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Self { _file: file, path }),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyRunning { path })
            },
            Err(source) => Err(LockError::Io { path, source }),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
