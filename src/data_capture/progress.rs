//! Human-readable progress output.
//!
//! Listeners push every record into one unbounded channel; a single printer task drains it
//! and writes to stdout, so lines from different listeners never interleave.

use std::io::Write;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::types::CaptureRecord;

/// How much of `decoded_text` the notable block shows.
const TEXT_EXCERPT_CHARS: usize = 100;

pub type ProgressSender = UnboundedSender<CaptureRecord>;

/// Single line for routine traffic.
pub fn format_routine(record: &CaptureRecord) -> String {
    format!(
        "[.] {} | {} -> {} | {} bytes | {}",
        record.timestamp.format("%H:%M:%S%.3f"),
        record.source,
        record.destination,
        record.size,
        record.protocol_guess
    )
}

/// Detailed block for notable traffic.
pub fn format_notable(record: &CaptureRecord) -> String {
    let mut out = String::from("\n[!] NOTABLE TRAFFIC\n");
    out.push_str(&format!(
        "    Time:     {}\n",
        record.timestamp.format("%H:%M:%S%.3f")
    ));
    out.push_str(&format!(
        "    Route:    {} -> {}\n",
        record.source, record.destination
    ));
    out.push_str(&format!("    Size:     {} bytes\n", record.size));
    out.push_str(&format!("    Protocol: {}\n", record.protocol_guess));

    if !record.matched_signatures.is_empty() {
        out.push_str("    Signatures:\n");
        for m in &record.matched_signatures {
            out.push_str(&format!("      - {} at offset {}\n", m.label, m.byte_offset));
        }
    }

    if !record.decoded_text.is_empty() {
        let excerpt: String = record.decoded_text.chars().take(TEXT_EXCERPT_CHARS).collect();
        let ellipsis = if record.decoded_text.chars().count() > TEXT_EXCERPT_CHARS {
            "..."
        } else {
            ""
        };
        out.push_str(&format!("    Text:     {}{}\n", excerpt, ellipsis));
    }

    out.push_str(&format!("    Hex:      {}\n", record.hex_preview));
    out
}

pub fn format_record(record: &CaptureRecord) -> String {
    if record.is_notable {
        format_notable(record)
    } else {
        format_routine(record)
    }
}

/// Starts the printer on the blocking pool, since stdout writes block. It ends once every
/// sender has been dropped and the queue is drained.
pub fn spawn_printer() -> (ProgressSender, JoinHandle<usize>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || print_records(rx, std::io::stdout()));
    (tx, handle)
}

/// Drains `rx` into `out`, one record at a time. Returns the number of records printed.
///
/// Blocks the calling thread; must not run on an async worker.
pub fn print_records<W: Write>(mut rx: UnboundedReceiver<CaptureRecord>, mut out: W) -> usize {
    let mut printed = 0;
    while let Some(record) = rx.blocking_recv() {
        if writeln!(out, "{}", format_record(&record)).is_err() {
            // stdout went away; keep draining so senders never see a closed channel
            continue;
        }
        let _ = out.flush();
        printed += 1;
    }
    printed
}
