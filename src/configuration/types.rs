use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport a listener binds to.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(alias = "tcp")]
    TCP,
    #[serde(alias = "udp")]
    UDP,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::TCP => write!(f, "TCP"),
            Protocol::UDP => write!(f, "UDP"),
        }
    }
}

/// One (port, protocol) pair to listen on.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl ListenerConfig {
    pub fn new(name: &str, port: u16, protocol: Protocol) -> Self {
        Self {
            name: name.to_string(),
            port,
            protocol,
        }
    }

    /// Ports the game talks to out of the box: web info files, TLS, the game
    /// server, two peer-to-peer ports and STUN.
    pub fn default_set() -> Vec<ListenerConfig> {
        vec![
            ListenerConfig::new("http", 80, Protocol::TCP),
            ListenerConfig::new("https", 443, Protocol::TCP),
            ListenerConfig::new("game-server", 8000, Protocol::TCP),
            ListenerConfig::new("p2p-1", 5739, Protocol::UDP),
            ListenerConfig::new("p2p-2", 5740, Protocol::UDP),
            ListenerConfig::new("stun", 3478, Protocol::UDP),
        ]
    }
}

impl fmt::Display for ListenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.protocol, self.port, self.name)
    }
}

/// Extra catalog entry read from the configuration file.
///
/// Exactly one of `text` or `hex` must be set.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub label: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub hex: Option<String>,
}
