//! Player session management for Broadside.
//!
//! This crate tracks the lifecycle of player connections:
//!
//! 1. **Identity**: a [`PlayerId`](broadside_protocol::PlayerId) per
//!    connection and a display name from JOIN
//! 2. **Session tracking**: knowing who is idle, queued, or in a room
//!    ([`SessionManager`])
//!
//! There is no authentication and no reconnection; a closed connection is
//! a removed session.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← routes each line using the sender's session
//!     ↕
//! Session Layer (this crate)  ← player identity and lifecycle state
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, RoomId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionState, display_name};
