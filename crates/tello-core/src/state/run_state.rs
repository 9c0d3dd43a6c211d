//! Persistence for the outcome of the most recent execution attempt.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{remove_if_present, write_atomic, StoreError};

const RUN_STATE_FILE: &str = "run_state";

/// Outcome of the single latest execution attempt.
///
/// This is a replace-on-write record, not a log; it is read only to decide
/// skip logic for the current calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStateRecord {
    /// When the attempt ran.
    pub timestamp: DateTime<Utc>,

    /// Whether the attempt completed without error.
    pub success: bool,

    /// Whether the attempt was a simulation that performed no real mutation
    /// on the external system.
    pub dry_run: bool,
}

/// Store for the [`RunStateRecord`].
#[derive(Debug, Clone)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    /// Create a store rooted at `state_folder`.
    #[must_use]
    pub fn new(state_folder: &Path) -> Self {
        Self {
            path: state_folder.join(RUN_STATE_FILE),
        }
    }

    /// Path of the backing record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last run record, surfacing corruption explicitly.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` when the file exists but does not parse
    /// as a run-state record, and `StoreError::Io` when the file cannot be
    /// read at all.
    pub fn try_read(&self) -> Result<Option<RunStateRecord>, StoreError> {
        let content = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            },
        };
        serde_json::from_slice::<RunStateRecord>(&content)
            .map(Some)
            .map_err(|err| StoreError::Corrupt {
                path: self.path.clone(),
                detail: format!("not a run-state record: {err}"),
            })
    }

    /// Read the last run record, degrading corruption to absence.
    #[must_use]
    pub fn read(&self) -> Option<RunStateRecord> {
        match self.try_read() {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "treating last run record as absent");
                None
            },
        }
    }

    /// Atomically replace the run record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn write(&self, record: &RunStateRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(record).map_err(|err| StoreError::Persist {
            path: self.path.clone(),
            detail: format!("failed to serialize run state: {err}"),
        })?;
        write_atomic(&self.path, &payload)
    }

    /// Remove the run record; absent record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be removed.
    pub fn clear(&self) -> Result<(), StoreError> {
        remove_if_present(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RunStateRecord {
        RunStateRecord {
            timestamp: "2025-11-22T09:30:00.123Z".parse().unwrap(),
            success: true,
            dry_run: false,
        }
    }

    #[test]
    fn test_run_state_roundtrip_preserves_millisecond_precision() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStateStore::new(temp.path());
        let record = sample_record();

        store.write(&record).expect("write run state");
        let loaded = store.read().expect("record present");
        assert_eq!(loaded, record);
        assert_eq!(loaded.timestamp, record.timestamp);
    }

    #[test]
    fn test_run_state_schema_fields_stable() {
        let value = serde_json::to_value(sample_record()).expect("serialize");
        assert!(value.get("timestamp").is_some());
        assert_eq!(
            value.get("success").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert_eq!(
            value.get("dryRun").and_then(serde_json::Value::as_bool),
            Some(false)
        );
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStateStore::new(temp.path());
        assert_eq!(store.try_read().expect("try_read"), None);
    }

    #[test]
    fn test_corrupt_file_degrades_to_absence() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStateStore::new(temp.path());
        std::fs::write(store.path(), b"{\"timestamp\":").expect("write garbage");

        let err = store.try_read().expect_err("corrupt record must surface");
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_write_replaces_prior_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStateStore::new(temp.path());
        store.write(&sample_record()).expect("first write");

        let later = RunStateRecord {
            timestamp: "2025-11-23T06:00:00Z".parse().unwrap(),
            success: false,
            dry_run: true,
        };
        store.write(&later).expect("second write");
        assert_eq!(store.read(), Some(later));
    }
}
