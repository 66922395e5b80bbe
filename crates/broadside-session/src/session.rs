//! Session types: the server's record of one connected player.
//!
//! A session tracks:
//! - WHO the player is (`PlayerId`, display name)
//! - WHERE they are in the lifecycle (idle, queued, seated in a room)
//! - HOW to reach them (an opaque handle owned by the server)

use broadside_protocol::{PlayerId, RoomId};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a connected player currently is.
///
/// ```text
///   Connected ──(JOIN)──→ Matchmaking ──(paired)──→ Playing(room)
///       ↑                      │                          │
///       │                (disconnect)               (room closes)
///       └──────────────────────┴──────────────────────────┘
/// ```
///
/// A player whose room closed goes back to `Connected` and may JOIN again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not queued, not in a room.
    Connected,

    /// Waiting in the matchmaking queue.
    Matchmaking,

    /// Seated in the given room.
    Playing(RoomId),
}

impl SessionState {
    /// Returns `true` if a JOIN from this state is allowed.
    pub fn can_join(self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session on the server.
///
/// `H` is whatever the server needs to reach the connection (for
/// Broadside, the socket and the outbound queue). The session layer only
/// stores it.
#[derive(Debug, Clone)]
pub struct Session<H> {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// Display name, set by JOIN. `None` until then.
    pub name: Option<String>,

    /// Current lifecycle state.
    pub state: SessionState,

    /// Handle to the underlying connection.
    pub handle: H,
}

/// Normalizes a requested display name.
///
/// Surrounding whitespace is trimmed; a missing or blank name becomes
/// `default`.
pub fn display_name(requested: Option<&str>, default: &str) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default.to_string(),
    }
}
