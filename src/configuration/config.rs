use super::types::*;
use crate::data_capture::signature_catalog::SignatureEntry;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on how long a listener may wait before it looks at the stop flag again.
pub const MAX_POLL_TIMEOUT_MS: u64 = 1000;

/// Command-line arguments.
///
/// Every option overrides the matching value read from the configuration file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pescap")]
#[command(version)]
#[command(about = "Listens on the game's ports and classifies whatever it receives")]
pub struct CliArgs {
    /// Optional TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Directory the session export is written to
    #[arg(long, env = "PESCAP_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Address every listener binds to
    #[arg(long)]
    pub bind_address: Option<IpAddr>,

    /// Maximum wait, in milliseconds, before a listener checks for a stop request
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,
}

/// Runtime configuration of the interceptor.
///
/// Read from TOML; any field left out of the file takes its default, so an empty file
/// describes the stock setup.
///
/// # Fields Overview
///
/// - `bind_address`: interface the listeners bind to, `0.0.0.0` by default
/// - `listeners`: the (port, protocol) pairs to open
/// - `buffer_size`: upper bound of a single capture, in bytes
/// - `poll_timeout_ms`: bounded wait used by every accept/receive call
/// - `read_timeout_ms`: bounded wait for the first bytes of an accepted TCP connection
/// - `export_dir`: where the JSON export lands when the session had notable traffic
/// - `signatures`: extra catalog entries appended after the built-in ones
/// - `lobby_sources`: lobby snapshot files, most preferred first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: IpAddr,
    pub listeners: Vec<ListenerConfig>,
    pub buffer_size: usize,
    pub poll_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub export_dir: PathBuf,
    pub signatures: Vec<SignatureConfig>,
    pub lobby_sources: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listeners: ListenerConfig::default_set(),
            buffer_size: 4096,
            poll_timeout_ms: 500,
            read_timeout_ms: 1000,
            export_dir: PathBuf::from("."),
            signatures: Vec::new(),
            lobby_sources: Vec::new(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from the command line: file first (if any), then the
    /// explicit overrides.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(dir) = &args.export_dir {
            config.export_dir = dir.clone();
        }
        if let Some(addr) = args.bind_address {
            config.bind_address = addr;
        }
        if let Some(ms) = args.poll_timeout_ms {
            config.poll_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listeners.is_empty() {
            return Err(ConfigError::ListenersEmpty(
                "at least one listener must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for listener in &self.listeners {
            if !seen.insert((listener.port, listener.protocol)) {
                return Err(ConfigError::DuplicateListener(listener.to_string()));
            }
        }

        if self.poll_timeout_ms == 0 || self.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
            return Err(ConfigError::NotInRange(format!(
                "poll_timeout_ms must be within 1..={}, got {}",
                MAX_POLL_TIMEOUT_MS, self.poll_timeout_ms
            )));
        }

        if self.read_timeout_ms == 0 {
            return Err(ConfigError::NotInRange(
                "read_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.buffer_size == 0 || self.buffer_size > u16::MAX as usize {
            return Err(ConfigError::NotInRange(format!(
                "buffer_size must be within 1..={}, got {}",
                u16::MAX,
                self.buffer_size
            )));
        }

        for signature in &self.signatures {
            SignatureEntry::try_from(signature)?;
        }

        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
