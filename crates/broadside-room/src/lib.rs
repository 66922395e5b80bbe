//! Matchmaking and game rooms for Broadside.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns both
//! players' boards and the turn.
//!
//! # Key types
//!
//! - [`Matchmaker`]: FIFO queue that pairs the two longest-waiting players
//! - [`Battle`]: the pure placement/turn/attack state machine
//! - [`RoomManager`]: pairs players, spawns rooms, routes commands
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: lifecycle state machine
//! - [`RoomConfig`]: room settings (channel size, chat limit)

mod config;
mod error;
mod logic;
mod manager;
mod matchmaker;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use logic::{Battle, Outbox, Seat};
pub use manager::{MatchOutcome, RoomManager};
pub use matchmaker::{Enqueued, Entrant, Matchmaker};
pub use room::{PlayerSender, RoomClosed, RoomHandle, RoomInfo};
