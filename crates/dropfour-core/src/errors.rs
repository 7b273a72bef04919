//! Move and admission errors.

use crate::board::{COLUMNS, Player};
use crate::ids::{ConnectionId, SessionId};

/// Reasons a move is refused. None of these change any state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    // Game rules
    /// A winner has already been decided.
    #[error("game is already over")]
    GameOver,
    /// The mover is not the player to move.
    #[error("not player {player}'s turn")]
    NotYourTurn { player: Player },
    /// Column index outside the board.
    #[error("column {column} is outside 0..{}", COLUMNS)]
    ColumnOutOfRange { column: i64 },
    /// No empty cell left in the column.
    #[error("column {column} is full")]
    ColumnFull { column: usize },

    // Registry lookups
    /// No such session in the registry.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    /// The connection is not a participant of the session.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

impl MoveError {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameOver => "game_over",
            Self::NotYourTurn { .. } => "not_your_turn",
            Self::ColumnOutOfRange { .. } => "column_out_of_range",
            Self::ColumnFull { .. } => "column_full",
            Self::UnknownSession(_) => "unknown_session",
            Self::UnknownConnection(_) => "unknown_connection",
        }
    }
}

/// Reasons a connection is refused a seat.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AdmitError {
    /// Every seat is taken.
    #[error("session {session_id} already has {capacity} participants")]
    SessionFull { session_id: SessionId, capacity: usize },
}
