//! Lobby directory.
//!
//! Read-only view of the lobbies the community server advertises, used at start-up to show
//! what the game should find once it reaches the lobby screen.

pub mod directory;
pub mod file_store;
pub mod types;

pub use directory::{FallbackDirectory, LobbyDirectory};
pub use file_store::FileLobbyStore;
pub use types::LobbySummary;
