//! Export Storage Trait
//!
//! Defines where a finished session's capture log is persisted. The summary reporter only
//! talks to this trait, so tests can swap the filesystem for memory or for a backend that
//! always fails.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::data_capture::types::CaptureRecord;
use crate::error_handling::types::StorageError;

pub trait ExportStorage: Send + Sync {
    /// Persists `records` in order under a name derived from `captured_at` and returns
    /// where they went.
    fn export_capture_log(
        &self,
        records: &[CaptureRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError>;
}
