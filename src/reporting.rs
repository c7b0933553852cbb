pub mod summary_reporter;

pub use summary_reporter::{ExportOutcome, SummaryReport, SummaryReporter};
