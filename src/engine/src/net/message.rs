use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::game::grid::BoardWire;
use crate::game::tile::Tile;

/// A request as the server expects it, before the message id envelope is
/// wrapped around it. Grid coordinates are logical: `x` along columns, `y`
/// along rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join,
    Draw { draw_id: u64 },
    Discard { tile_id: i64 },
    Recall { tile_id: i64 },
    Swap { first_id: i64, second_id: i64 },
    Move { tile_id: i64, x: i32, y: i32 },
    Play { tile_id: i64, x: i32, y: i32 },
    Check,
    Ready { ready: bool },
    Start,
    Admit { target_id: u64, admit: bool, playing: bool },
    Countback { value: i64 },
    Peek,
}

/// The outbound frame: a client message stamped with the id used to correlate
/// the reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub message_id: u64,
    #[serde(flatten)]
    pub body: ClientMessage,
}

impl Envelope {
    pub fn encode(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Per-player state fragment: a full `state` reply carries the whole hand and
/// board, an `added` fragment only what changed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddedState {
    #[serde(default)]
    pub hand: Option<Vec<Tile>>,
    #[serde(default)]
    pub board: Option<BoardWire>,
}

/// One line of the running scoreboard carried by a `synopsis` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerSummary {
    /// Server-side user id.
    #[serde(default)]
    pub user: u64,
    #[serde(default)]
    pub playing: bool,
    /// Tiles currently in this player's hand; absent for spectators.
    #[serde(default)]
    pub in_hand: Option<u32>,
}

/// One player's final position as reported in the end-of-game results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub board: Option<BoardWire>,
    #[serde(default)]
    pub hand: Option<Vec<Tile>>,
    #[serde(default)]
    pub unwords: Vec<String>,
}

/// Any inbound frame. The server reuses one loosely-shaped notification
/// format across message types, so every field is optional and the
/// `message_type` string selects which ones are meaningful.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub message_id: u64,
    #[serde(default)]
    pub reply_to: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub hand: Option<Vec<Tile>>,
    #[serde(default)]
    pub board: Option<BoardWire>,
    #[serde(default)]
    pub added: Option<AddedState>,
    #[serde(default)]
    pub draw_id: Option<u64>,
    #[serde(default)]
    pub remaining: Option<i64>,
    #[serde(default)]
    pub unwords: Option<Vec<String>>,

    // Countdown payload; echoed back verbatim in a countback.
    #[serde(default)]
    pub value: Option<i64>,

    #[serde(default)]
    pub players: Option<Vec<PlayerSummary>>,

    #[serde(default)]
    pub drawer: Option<u64>,
    #[serde(default)]
    pub winner: Option<u64>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub player_data: Option<Vec<PlayerSnapshot>>,
    #[serde(default)]
    pub player_map: Option<HashMap<usize, u64>>,
}

impl ServerMessage {
    pub fn decode(raw: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_error(&self) -> bool {
        self.message_type == "error" || self.error.is_some()
    }

    /// The error text, preferring the dedicated field over the generic
    /// message body.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unspecified server error".to_string())
    }
}
