//! Turn-based game state for one session.

use serde::{Deserialize, Serialize};

use crate::board::{Board, COLUMNS, Player, ROWS, has_four_in_a_row};
use crate::errors::MoveError;

/// Authoritative state of one game. All mutation goes through [`GameState::apply_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    next_player: Player,
    winner: Option<Player>,
    moves: u32,
}

/// A move that was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Who moved.
    pub player: Player,
    /// Row the mark landed in (0 is the top row).
    pub row: usize,
    /// Column played.
    pub column: usize,
    /// Set when this move won the game.
    pub winner: Option<Player>,
}

/// Wire form of the game, broadcast after every accepted move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Rows top to bottom; 0 empty, otherwise the player number.
    pub board: [[u8; COLUMNS]; ROWS],
    /// Player number to move next.
    pub next_player: u8,
    /// 0 while undecided, otherwise the winning player number.
    pub winner: u8,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Fresh game: empty board, player 1 to move, no winner.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            next_player: Player::One,
            winner: None,
            moves: 0,
        }
    }

    /// Apply `player`'s move into `column`.
    ///
    /// Checks run in order: game over, turn, column range, column space.
    /// On any error the state is untouched.
    pub fn apply_move(&mut self, column: i64, player: Player) -> Result<MoveOutcome, MoveError> {
        if self.winner.is_some() {
            return Err(MoveError::GameOver);
        }
        if player != self.next_player {
            return Err(MoveError::NotYourTurn { player });
        }
        let col = usize::try_from(column)
            .ok()
            .filter(|c| *c < COLUMNS)
            .ok_or(MoveError::ColumnOutOfRange { column })?;
        let row = self
            .board
            .drop_mark(col, player)
            .ok_or(MoveError::ColumnFull { column: col })?;
        self.moves += 1;

        if has_four_in_a_row(&self.board, player) {
            self.winner = Some(player);
        } else {
            self.next_player = player.opponent();
        }

        Ok(MoveOutcome {
            player,
            row,
            column: col,
            winner: self.winner,
        })
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Player to move.
    pub fn next_player(&self) -> Player {
        self.next_player
    }

    /// Winner, once decided.
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    /// Accepted moves so far.
    pub fn move_count(&self) -> u32 {
        self.moves
    }

    /// Whether a winner has been decided.
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Board is full and nobody won. Moves are still rejected as `ColumnFull`.
    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && self.board.is_full()
    }

    /// Wire form of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board.to_grid(),
            next_player: self.next_player.number(),
            winner: self.winner.map_or(0, Player::number),
        }
    }
}
