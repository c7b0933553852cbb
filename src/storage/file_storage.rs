use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;

use crate::data_capture::types::CaptureRecord;
use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::ExportStorage;

const EXPORT_PREFIX: &str = "pes_traffic_log_";

/// Writes each export as a pretty-printed JSON array in `base_path`.
///
/// Files are named `pes_traffic_log_<unix-seconds>.json`; a numeric suffix is added when a
/// file with that name already exists, so an export never overwrites an earlier one.
pub struct FileExportStorage {
    base_path: PathBuf,
}

impl FileExportStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_export_file(&self, captured_at: DateTime<Utc>) -> Result<(PathBuf, fs::File), StorageError> {
        let stem = format!("{}{}", EXPORT_PREFIX, captured_at.timestamp());
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.json", stem)
            } else {
                format!("{}_{}.json", stem, attempt)
            };
            let path = self.base_path.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    error!("Failed to create export file {}: {}", path.display(), e);
                    return Err(StorageError::WriteFailed(format!("{}: {}", path.display(), e)));
                }
            }
        }
    }
}

impl FileExportStorage {
    /// Writes `value` to a fresh export file. A file left half-written by a failed
    /// serialization or flush is removed again.
    fn write_export<T: Serialize + ?Sized>(
        &self,
        value: &T,
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.base_path).map_err(|e| {
            error!("Failed to create export dir {}: {}", self.base_path.display(), e);
            StorageError::DirectoryUnavailable(format!("{}: {}", self.base_path.display(), e))
        })?;

        let (path, file) = self.create_export_file(captured_at)?;
        let mut writer = BufWriter::new(file);

        let written = serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))
            .and_then(|_| {
                writer
                    .flush()
                    .map_err(|e| StorageError::WriteFailed(format!("{}: {}", path.display(), e)))
            });
        drop(writer);

        if let Err(e) = written {
            error!("Failed to write export {}: {}", path.display(), e);
            if let Err(rm) = fs::remove_file(&path) {
                warn!("Could not remove partial export {}: {}", path.display(), rm);
            }
            return Err(e);
        }
        Ok(path)
    }
}

impl ExportStorage for FileExportStorage {
    fn export_capture_log(
        &self,
        records: &[CaptureRecord],
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let path = self.write_export(records, captured_at)?;
        info!("Exported {} record(s) to {}", records.len(), path.display());
        Ok(path)
    }
}
