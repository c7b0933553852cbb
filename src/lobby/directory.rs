use log::warn;

use crate::error_handling::types::LobbyError;
use crate::lobby::types::LobbySummary;

pub trait LobbyDirectory: Send + Sync {
    fn list_lobbies(&self) -> Result<Vec<LobbySummary>, LobbyError>;

    /// Short name used in log lines.
    fn describe(&self) -> String;
}

/// Asks each source in turn and returns the first answer.
pub struct FallbackDirectory {
    sources: Vec<Box<dyn LobbyDirectory>>,
}

impl FallbackDirectory {
    pub fn new(sources: Vec<Box<dyn LobbyDirectory>>) -> Self {
        Self { sources }
    }
}

impl LobbyDirectory for FallbackDirectory {
    fn list_lobbies(&self) -> Result<Vec<LobbySummary>, LobbyError> {
        for source in &self.sources {
            match source.list_lobbies() {
                Ok(lobbies) => return Ok(lobbies),
                Err(e) => warn!("Lobby source {} failed: {}", source.describe(), e),
            }
        }
        Err(LobbyError::NoSources)
    }

    fn describe(&self) -> String {
        format!("fallback of {} source(s)", self.sources.len())
    }
}
