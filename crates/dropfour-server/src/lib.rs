//! # dropfour-server
//!
//! Session registry and WebSocket front end for two-player connect-four.
//!
//! - [`SessionRegistry`]: every live session behind one lock
//! - [`run_connection`]: per-client admission, move handling and cleanup
//! - [`DropFourServer`]: Axum router, static pages and `/health`

#![deny(unsafe_code)]

pub mod broadcast;
pub mod connection;
pub mod health;
pub mod participant;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use connection::{ConnectionConfig, run_connection};
pub use participant::Participant;
pub use registry::{Admission, SESSION_CAPACITY, SessionRegistry};
pub use server::{AppState, DropFourServer};
pub use shutdown::{ShutdownCoordinator, wait_for_signal};
