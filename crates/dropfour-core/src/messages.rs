//! JSON wire messages exchanged over the WebSocket.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::board::Player;
use crate::game::GameSnapshot;

/// Server → client messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Sent only to a newly admitted connection.
    PlayerAssigned { player: Player },
    /// Broadcast when a session reaches two participants.
    GameStarted { next_player: Player },
    /// Broadcast after every accepted move.
    State(GameSnapshot),
    /// Sent only to the mover when rejection notices are enabled.
    MoveRejected { reason: String },
}

impl ServerMessage {
    /// JSON value as it appears on the wire.
    pub fn to_value(&self) -> Value {
        match self {
            Self::PlayerAssigned { player } => json!({
                "message": "Player assigned",
                "player": player.number(),
            }),
            Self::GameStarted { next_player } => json!({
                "message": "Game started",
                "nextPlayer": next_player.number(),
            }),
            Self::State(snapshot) => json!(snapshot),
            Self::MoveRejected { reason } => json!({
                "message": "Move rejected",
                "reason": reason,
            }),
        }
    }

    /// Serialized text frame.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerAssigned { .. } => "player_assigned",
            Self::GameStarted { .. } => "game_started",
            Self::State(_) => "state",
            Self::MoveRejected { .. } => "move_rejected",
        }
    }
}

/// Client → server move request: `{"column": <int>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    /// Target column. Range is checked by the game, not here.
    pub column: i64,
}

impl MoveRequest {
    /// Decode a text frame. Anything without an integer `column` is an error.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
