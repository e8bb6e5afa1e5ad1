//! Client engine for a Rush!-style anagram race: the sparse drift-tracked
//! letter grid, word extraction, the hand/grid mutation API, and the
//! channel-based protocol layer that reconciles local optimistic state with
//! the authoritative server.

pub mod error;
pub mod game;
pub mod net;
pub mod session;

pub use error::EngineError;
pub use game::{Bank, BoardWire, GameState, Grid, Location, Pos, Tile, Word};
pub use net::{ClientMessage, PlayerSummary, ServerMessage, Transport};
pub use session::{GameSession, PlayerResult, RefreshTimer, SessionConfig, SessionEvent};
