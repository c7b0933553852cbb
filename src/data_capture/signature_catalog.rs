//! Byte signatures the classifier looks for.
//!
//! The catalog is the only place protocol knowledge lives: adding a pattern here (or in the
//! `[[signatures]]` section of the configuration file) needs no change anywhere else.

use crate::configuration::types::SignatureConfig;
use crate::error_handling::types::ConfigError;

/// A non-empty byte pattern and the label reported when it is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pattern: Vec<u8>,
    label: String,
}

impl SignatureEntry {
    pub fn new(pattern: impl Into<Vec<u8>>, label: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        let label = label.into();
        if pattern.is_empty() {
            return Err(ConfigError::BadSignature(format!(
                "signature '{}' has an empty pattern",
                label
            )));
        }
        Ok(Self { pattern, label })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl TryFrom<&SignatureConfig> for SignatureEntry {
    type Error = ConfigError;

    fn try_from(config: &SignatureConfig) -> Result<Self, Self::Error> {
        let pattern = match (&config.text, &config.hex) {
            (Some(text), None) => text.as_bytes().to_vec(),
            (None, Some(encoded)) => hex::decode(encoded.replace(' ', "")).map_err(|e| {
                ConfigError::BadSignature(format!("signature '{}': {}", config.label, e))
            })?,
            _ => {
                return Err(ConfigError::BadSignature(format!(
                    "signature '{}' needs exactly one of `text` or `hex`",
                    config.label
                )))
            }
        };
        SignatureEntry::new(pattern, config.label.clone())
    }
}

// (pattern, label), in match-reporting order
const BUILTIN_SIGNATURES: &[(&[u8], &str)] = &[
    (b"PES21", "PES 2021 Protocol Header"),
    (b"KONAMI", "Konami Protocol"),
    (b"LOBBY", "Lobby Communication"),
    (b"LOGIN", "Login Protocol"),
    (b"MATCH", "Match Data"),
    (b"P2P", "Peer-to-Peer"),
    (b"\x50\x45\x53", "PES Binary Signature"),
    (b"\x4B\x4F\x4E", "Konami Binary"),
    (b"HTTP", "HTTP Protocol"),
    (b"GET ", "HTTP GET Request"),
    (b"POST", "HTTP POST Request"),
];

/// Ordered, read-only collection of signatures.
#[derive(Debug, Clone)]
pub struct SignatureCatalog {
    entries: Vec<SignatureEntry>,
}

impl SignatureCatalog {
    pub fn from_entries(entries: Vec<SignatureEntry>) -> Self {
        Self { entries }
    }

    /// The built-in table followed by the configured extras.
    pub fn with_extra(extra: &[SignatureConfig]) -> Result<Self, ConfigError> {
        let mut catalog = Self::default();
        for config in extra {
            catalog.entries.push(SignatureEntry::try_from(config)?);
        }
        Ok(catalog)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignatureEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SignatureCatalog {
    fn default() -> Self {
        let entries = BUILTIN_SIGNATURES
            .iter()
            .map(|(pattern, label)| SignatureEntry {
                pattern: pattern.to_vec(),
                label: label.to_string(),
            })
            .collect();
        Self { entries }
    }
}
