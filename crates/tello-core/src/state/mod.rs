//! State folder persistence.
//!
//! The state folder holds two single-purpose records plus an advisory lock
//! file:
//!
//! ```text
//! <state_folder>/
//!   due_date     # single calendar date, ISO 8601 (YYYY-MM-DD), plain text
//!   run_state    # JSON: {"timestamp": ..., "success": ..., "dryRun": ...}
//!   .lock        # advisory lock held for decide()..record_outcome()
//! ```
//!
//! Each record has one writer and one reader pattern so the "last due date"
//! and "last run outcome" concerns stay independently invalidatable. All
//! writes go through a temp-file-then-rename so a crash mid-write cannot
//! leave a half-written record.

use std::io::Write;
use std::path::{Path, PathBuf};

mod due_date;
mod lock;
mod run_state;

pub use due_date::DueDateStore;
pub use lock::{LockError, StateLock};
pub use run_state::{RunStateRecord, RunStateStore};

/// Errors raised by the record stores.
///
/// Corruption and write failures are recoverable by policy: callers degrade
/// corruption to absence and proceed unpersisted on write failure, logging a
/// warning either way.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// I/O error reading or removing a record file.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The record file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The record file exists but does not parse.
    #[error("corrupt record at {path}: {detail}")]
    Corrupt {
        /// The record file path.
        path: PathBuf,
        /// Parse failure detail.
        detail: String,
    },

    /// The atomic write could not be completed.
    #[error("failed to persist {path}: {detail}")]
    Persist {
        /// The record file path.
        path: PathBuf,
        /// Write failure detail.
        detail: String,
    },
}

/// Atomically replace `path` with `bytes`.
///
/// Writes to a temp file in the same directory, syncs it, then renames it
/// over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Persist {
        path: path.to_path_buf(),
        detail: "record path has no parent directory".to_string(),
    })?;
    std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|err| StoreError::Persist {
        path: path.to_path_buf(),
        detail: format!("failed to create temp file: {err}"),
    })?;
    temp.write_all(bytes).map_err(|err| StoreError::Persist {
        path: path.to_path_buf(),
        detail: format!("failed to write temp file: {err}"),
    })?;
    temp.as_file()
        .sync_all()
        .map_err(|err| StoreError::Persist {
            path: path.to_path_buf(),
            detail: format!("failed to sync temp file: {err}"),
        })?;
    temp.persist(path).map_err(|err| StoreError::Persist {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    Ok(())
}

/// Remove a record file, treating an absent file as success.
fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
