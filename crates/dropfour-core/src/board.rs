//! The 6x7 grid and four-in-a-row detection.

use std::fmt;

/// Number of rows. Row 0 is the top of the board.
pub const ROWS: usize = 6;
/// Number of columns.
pub const COLUMNS: usize = 7;
/// Marks in a line needed to win.
const WIN_LENGTH: isize = 4;

/// Scan directions as (row step, column step): right, down, down-right, up-right.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// One of the two seats in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    /// Moves first.
    One,
    /// Moves second.
    Two,
}

impl Player {
    /// Wire number of this player (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Player for a wire number, if it is 1 or 2.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }

    /// The other player.
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Grid of cells, each empty or holding one player's mark.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Player>; COLUMNS]; ROWS],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark at `(row, column)`; `None` for empty or out-of-bounds cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<Player> {
        self.cells.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    /// Whether `column` has at least one empty cell. Out-of-range columns are never open.
    pub fn is_column_open(&self, column: usize) -> bool {
        column < COLUMNS && self.cells[0][column].is_none()
    }

    /// Whether every cell is taken.
    pub fn is_full(&self) -> bool {
        (0..COLUMNS).all(|c| !self.is_column_open(c))
    }

    /// Place `player`'s mark in the lowest empty cell of `column`.
    ///
    /// Returns the row the mark landed in, or `None` if the column is out of
    /// range or full. The board is unchanged on `None`.
    pub fn drop_mark(&mut self, column: usize, player: Player) -> Option<usize> {
        if column >= COLUMNS {
            return None;
        }
        let row = (0..ROWS).rev().find(|&row| self.cells[row][column].is_none())?;
        self.cells[row][column] = Some(player);
        Some(row)
    }

    /// Wire form: 0 for empty, otherwise the player number.
    pub fn to_grid(&self) -> [[u8; COLUMNS]; ROWS] {
        let mut grid = [[0; COLUMNS]; ROWS];
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                grid[row][col] = cell.map_or(0, Player::number);
            }
        }
        grid
    }
}

/// Whether `player` has four consecutive marks in any row, column or diagonal.
pub fn has_four_in_a_row(board: &Board, player: Player) -> bool {
    (0..ROWS).any(|row| {
        (0..COLUMNS).any(|col| {
            DIRECTIONS
                .iter()
                .any(|&step| line_from(board, player, row, col, step))
        })
    })
}

fn line_from(board: &Board, player: Player, row: usize, col: usize, (dr, dc): (isize, isize)) -> bool {
    (0..WIN_LENGTH).all(|i| {
        let r = row.checked_add_signed(dr * i);
        let c = col.checked_add_signed(dc * i);
        matches!((r, c), (Some(r), Some(c)) if board.cell(r, c) == Some(player))
    })
}
