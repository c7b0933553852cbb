use std::fmt;

use crate::configuration::types::Protocol;
use crate::session_management::SessionState;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    ListenersEmpty(String),
    DuplicateListener(String),
    BadSignature(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::ListenersEmpty(e) => write!(f, "Listeners configuration error: {}", e),
            ConfigError::DuplicateListener(e) => write!(f, "Duplicate listener: {}", e),
            ConfigError::BadSignature(e) => write!(f, "Signature error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Errors raised by a single port listener.
///
/// `BindFailure` is terminal for the listener that hit it and for nobody else.
/// `TransientIo` is logged by the listener loop, which then keeps waiting.
#[derive(Debug)]
pub enum NetworkError {
    BindFailure {
        port: u16,
        protocol: Protocol,
        source: std::io::Error,
    },
    TransientIo(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindFailure {
                port,
                protocol,
                source,
            } => write!(f, "Failed to bind {} port {}: {}", protocol, port, source),
            NetworkError::TransientIo(e) => write!(f, "Transient network error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum StorageError {
    DirectoryUnavailable(String),
    SerializationFailed(String),
    WriteFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DirectoryUnavailable(e) => write!(f, "Export directory unavailable: {}", e),
            StorageError::SerializationFailed(e) => write!(f, "Export serialization failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Export write failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum SessionError {
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
    ListenerJoinFailed(String),
    ReportFailed(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidTransition { from, to } => {
                write!(f, "Invalid session transition: {} -> {}", from, to)
            }
            SessionError::ListenerJoinFailed(e) => write!(f, "Listener task failed: {}", e),
            SessionError::ReportFailed(e) => write!(f, "Summary report failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
pub enum LobbyError {
    Unavailable(String),
    ParseFailed(String),
    NoSources,
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::Unavailable(e) => write!(f, "Lobby source unavailable: {}", e),
            LobbyError::ParseFailed(e) => write!(f, "Lobby data could not be parsed: {}", e),
            LobbyError::NoSources => write!(f, "No lobby source answered"),
        }
    }
}

impl std::error::Error for LobbyError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    SessionError(SessionError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::SessionError(e) => write!(f, "Session error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<SessionError> for ControllerError {
    fn from(err: SessionError) -> Self {
        ControllerError::SessionError(err)
    }
}
