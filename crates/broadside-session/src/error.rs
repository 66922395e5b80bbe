//! Error types for the session layer.

use broadside_protocol::PlayerId;

/// Errors that can occur during session management.
///
/// Each one answers a single client command with an `ERROR` reply; none
/// of them end the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    ///
    /// The connection handler removes a session on its way out, so this
    /// only shows up when a late message races that cleanup.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The player sent JOIN while already queued or seated in a room.
    #[error("player {0} has already joined")]
    AlreadyJoined(PlayerId),
}
