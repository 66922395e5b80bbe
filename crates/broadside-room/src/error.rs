//! Error types for the room layer.

use broadside_board::BoardError;
use broadside_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The player is already seated in a room.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is already waiting for an opponent.
    #[error("player {0} is already waiting for an opponent")]
    AlreadyQueued(PlayerId),

    /// The player is not in any room.
    #[error("player {0} is not in a game")]
    NotInRoom(PlayerId),

    /// The room's command channel is closed (the room has ended).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// A board invariant broke inside a running game. Fatal to that room
    /// only.
    #[error("room {room_id} aborted: {source}")]
    Invariant {
        room_id: RoomId,
        #[source]
        source: BoardError,
    },
}
