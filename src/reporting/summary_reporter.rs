//! End-of-session summary.
//!
//! The reporter runs once per session, after every listener has exited, against the final
//! and now immutable capture log. It groups notable records by protocol guess and by matched
//! signature label, and exports the full log when there was anything notable at all.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::data_capture::types::{CaptureRecord, ProtocolGuess};
use crate::network::port_listener::{ListenerOutcome, ListenerReport};
use crate::storage::storage_trait::ExportStorage;

const RULE: &str = "================================================================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No notable record, nothing written.
    Skipped,
    Written(PathBuf),
    /// The export could not be written; the in-memory summary is still valid.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub total_records: usize,
    pub notable_count: usize,
    pub by_protocol: BTreeMap<ProtocolGuess, usize>,
    /// A record matching several labels counts once for each of them.
    pub by_signature: BTreeMap<String, usize>,
    pub listeners: Vec<ListenerReport>,
    pub export: ExportOutcome,
}

impl SummaryReport {
    pub fn has_notable_traffic(&self) -> bool {
        self.notable_count > 0
    }
}

#[derive(Clone)]
pub struct SummaryReporter {
    storage: Arc<dyn ExportStorage>,
}

impl SummaryReporter {
    pub fn new(storage: Arc<dyn ExportStorage>) -> Self {
        Self { storage }
    }

    /// Builds the report for `records` and, when any of them is notable, exports the full
    /// log under a name derived from `captured_at`.
    pub fn report(
        &self,
        records: &[CaptureRecord],
        listeners: &[ListenerReport],
        captured_at: DateTime<Utc>,
    ) -> SummaryReport {
        let mut by_protocol = BTreeMap::new();
        let mut by_signature = BTreeMap::new();
        let mut notable_count = 0;

        for record in records.iter().filter(|r| r.is_notable) {
            notable_count += 1;
            *by_protocol.entry(record.protocol_guess).or_insert(0) += 1;
            for m in &record.matched_signatures {
                *by_signature.entry(m.label.clone()).or_insert(0) += 1;
            }
        }

        let export = if notable_count == 0 {
            info!("No notable traffic, skipping export");
            ExportOutcome::Skipped
        } else {
            match self.storage.export_capture_log(records, captured_at) {
                Ok(path) => ExportOutcome::Written(path),
                Err(e) => {
                    warn!("Could not export capture log: {}", e);
                    ExportOutcome::Failed(e.to_string())
                }
            }
        };

        SummaryReport {
            total_records: records.len(),
            notable_count,
            by_protocol,
            by_signature,
            listeners: listeners.to_vec(),
            export,
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "TRAFFIC CAPTURE SUMMARY")?;
        writeln!(f, "{}", RULE)?;

        if !self.listeners.is_empty() {
            writeln!(f, "\nListeners:")?;
            for report in &self.listeners {
                match &report.outcome {
                    ListenerOutcome::Stopped {
                        captured,
                        transient_errors,
                    } => writeln!(
                        f,
                        "   - {}: {} capture(s), {} transient error(s)",
                        report.listener, captured, transient_errors
                    )?,
                    ListenerOutcome::BindFailed(reason) => {
                        writeln!(f, "   - {}: not started ({})", report.listener, reason)?
                    }
                }
            }
        }

        writeln!(f, "\nRecords captured: {}", self.total_records)?;

        if !self.has_notable_traffic() {
            writeln!(f, "No notable traffic captured")?;
            writeln!(f, "\nPossible reasons:")?;
            writeln!(f, "   - The game is not making network connections")?;
            writeln!(f, "   - Traffic is encrypted or obfuscated")?;
            writeln!(f, "   - Different ports are being used")?;
            writeln!(f, "   - Specific in-game actions are needed to trigger traffic")?;
            return Ok(());
        }

        writeln!(f, "Notable records: {}", self.notable_count)?;

        writeln!(f, "\nProtocols detected:")?;
        for (protocol, count) in &self.by_protocol {
            writeln!(f, "   - {}: {} record(s)", protocol, count)?;
        }

        if !self.by_signature.is_empty() {
            writeln!(f, "\nSignatures found:")?;
            for (label, count) in &self.by_signature {
                writeln!(f, "   - {}: {} time(s)", label, count)?;
            }
        }

        match &self.export {
            ExportOutcome::Written(path) => {
                writeln!(f, "\nDetailed log saved to: {}", path.display())?
            }
            ExportOutcome::Failed(reason) => writeln!(f, "\nCould not save log: {}", reason)?,
            ExportOutcome::Skipped => {}
        }

        Ok(())
    }
}
