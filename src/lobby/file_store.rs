use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error_handling::types::LobbyError;
use crate::lobby::directory::LobbyDirectory;
use crate::lobby::types::LobbySummary;

#[derive(Deserialize)]
#[serde(untagged)]
enum LobbyFile {
    List(Vec<LobbySummary>),
    Wrapped { lobbies: Vec<LobbySummary> },
}

/// Lobby snapshot kept on disk, either a bare JSON array or `{"lobbies": [...]}`.
pub struct FileLobbyStore {
    path: PathBuf,
}

impl FileLobbyStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LobbyDirectory for FileLobbyStore {
    fn list_lobbies(&self) -> Result<Vec<LobbySummary>, LobbyError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| LobbyError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        let file: LobbyFile = serde_json::from_str(&content)
            .map_err(|e| LobbyError::ParseFailed(format!("{}: {}", self.path.display(), e)))?;

        Ok(match file {
            LobbyFile::List(lobbies) | LobbyFile::Wrapped { lobbies } => lobbies,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
