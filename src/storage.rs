//! Storage subsystem
//!
//! - `storage_trait`: the `ExportStorage` trait used by the summary reporter.
//! - `file_storage`: JSON export to a directory on disk.

pub mod file_storage;
pub mod storage_trait;

pub use file_storage::FileExportStorage;
pub use storage_trait::ExportStorage;
