//! # dropfour-core
//!
//! Game rules and wire types, free of any I/O.
//!
//! - [`board`]: the 6x7 grid and the four-in-a-row detector
//! - [`game`]: per-session turn/winner state machine
//! - [`messages`]: JSON frames exchanged with clients
//! - [`ids`]: session and connection identifiers
//! - [`errors`]: move and admission errors

#![deny(unsafe_code)]

pub mod board;
pub mod errors;
pub mod game;
pub mod ids;
pub mod messages;

pub use board::{Board, COLUMNS, Player, ROWS, has_four_in_a_row};
pub use errors::{AdmitError, MoveError};
pub use game::{GameSnapshot, GameState, MoveOutcome};
pub use ids::{ConnectionId, SessionId};
pub use messages::{MoveRequest, ServerMessage};
