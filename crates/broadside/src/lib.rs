//! # Broadside
//!
//! Networked two-player Battleship: a line-protocol TCP server that pairs
//! players first come, first served, and referees each game in its own
//! room task.
//!
//! The layers live in their own crates and are re-exported here:
//!
//! - `broadside-board`: grid, fleet, placement, and attack resolution
//! - `broadside-protocol`: the `TYPE:k=v;k=v` codec and typed messages
//! - `broadside-transport`: newline-framed TCP connections
//! - `broadside-session`: connected players and their lifecycle
//! - `broadside-room`: matchmaking and the per-game actor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use broadside::prelude::*;
//!
//! # async fn demo() -> Result<(), BroadsideError> {
//! let server = BroadsideServer::builder()
//!     .bind("127.0.0.1:8889")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod server;

pub use client::BroadsideClient;
pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::BroadsideError;
pub use server::{BroadsideServer, BroadsideServerBuilder};

pub use broadside_board as board;
pub use broadside_protocol as protocol;
pub use broadside_room as room;
pub use broadside_session as session;
pub use broadside_transport as transport;

/// The types most programs need.
pub mod prelude {
    pub use crate::{BroadsideClient, BroadsideError, BroadsideServer, ServerConfig};
    pub use broadside_board::{Board, Coord, FLEET, Ship};
    pub use broadside_protocol::{AttackReport, ClientCommand, PlayerId, RoomId, ServerEvent};
}
