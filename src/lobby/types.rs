use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_MAX_PLAYERS: u32 = 22;

fn default_max_players() -> u32 {
    DEFAULT_MAX_PLAYERS
}

fn default_status() -> String {
    "waiting".to_string()
}

/// One advertised lobby.
///
/// Sources disagree on the name field, so both `name` and `lobby_name` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "lobby_name")]
    pub name: String,
    #[serde(default)]
    pub current_players: u32,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default = "default_status")]
    pub status: String,
}

impl fmt::Display for LobbySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{})",
            self.name, self.current_players, self.max_players
        )
    }
}
