//! Common data types used across the data_capture subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// One side of a transmission. Display only, never resolved or connected to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The receiving side of a listener, shown as `localhost:<port>`.
    pub fn local(port: u16) -> Self {
        Self::new("localhost", port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Best-effort guess of what kind of traffic a buffer carries.
///
/// This is a heuristic label, not a protocol verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolGuess {
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "TLS")]
    Tls,
    #[serde(rename = "PES-Custom")]
    PesCustom,
    #[serde(rename = "Binary")]
    Binary,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl fmt::Display for ProtocolGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolGuess::Http => "HTTP",
            ProtocolGuess::Tls => "TLS",
            ProtocolGuess::PesCustom => "PES-Custom",
            ProtocolGuess::Binary => "Binary",
            ProtocolGuess::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// A catalog signature found in a buffer, at the index of its first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMatch {
    pub label: String,
    /// The matched pattern, lowercase hex.
    pub pattern_hex: String,
    pub byte_offset: usize,
}

/// Structured analysis of one inbound buffer.
///
/// Built once by the classifier, appended once to the capture log, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Capture time, sub-second precision
    pub timestamp: DateTime<Utc>,
    pub source: Endpoint,
    pub destination: Endpoint,
    /// Length of the captured buffer in bytes
    pub size: usize,
    /// Hex rendering of at most the first 64 bytes
    pub hex_preview: String,
    /// Every matching catalog entry, in catalog order
    pub matched_signatures: Vec<SignatureMatch>,
    /// Printable text extracted from the payload, at most 200 characters
    pub decoded_text: String,
    pub protocol_guess: ProtocolGuess,
    pub is_notable: bool,
}
