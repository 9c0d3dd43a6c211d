//! Persistence for the most-recently-observed renewal due date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::warn;

use super::{remove_if_present, write_atomic, StoreError};

const DUE_DATE_FILE: &str = "due_date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store for the single cached due date.
///
/// Absence means "never observed". At most one value is stored at a time.
#[derive(Debug, Clone)]
pub struct DueDateStore {
    path: PathBuf,
}

impl DueDateStore {
    /// Create a store rooted at `state_folder`.
    #[must_use]
    pub fn new(state_folder: &Path) -> Self {
        Self {
            path: state_folder.join(DUE_DATE_FILE),
        }
    }

    /// Path of the backing record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached due date, surfacing corruption explicitly.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` when the file exists but does not hold
    /// a single ISO 8601 calendar date, and `StoreError::Io` when the file
    /// cannot be read at all.
    pub fn try_read(&self) -> Result<Option<NaiveDate>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            },
        };
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(StoreError::Corrupt {
                path: self.path.clone(),
                detail: "due-date file is empty".to_string(),
            });
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map(Some).map_err(|err| {
            StoreError::Corrupt {
                path: self.path.clone(),
                detail: format!("not a YYYY-MM-DD date: {err}"),
            }
        })
    }

    /// Read the cached due date, degrading corruption to absence.
    ///
    /// A corrupt record logs a warning and reads as `None` so that a bad
    /// cache can never abort an invocation.
    #[must_use]
    pub fn read(&self) -> Option<NaiveDate> {
        match self.try_read() {
            Ok(date) => date,
            Err(err) => {
                warn!(error = %err, "treating cached due date as absent");
                None
            },
        }
    }

    /// Atomically persist `date` as the cached due date.
    ///
    /// # Errors
    ///
    /// Returns an error if the atomic write fails.
    pub fn write(&self, date: NaiveDate) -> Result<(), StoreError> {
        let rendered = format!("{}\n", date.format(DATE_FORMAT));
        write_atomic(&self.path, rendered.as_bytes())
    }

    /// Remove the cached due date; absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        remove_if_present(&self.path)
    }
}
