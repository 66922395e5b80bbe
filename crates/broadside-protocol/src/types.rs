//! Identity and routing types shared by every layer.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// This is a "newtype wrapper": a `u64` that can't be confused with a
/// [`RoomId`]. On the wire it travels as the bare number (`player_id=42`);
/// in logs it prints as `P-42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = std::num::ParseIntError;

    /// Parses the wire form (`"42"`). The `P-` log prefix is accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix("P-").unwrap_or(s).parse().map(PlayerId)
    }
}

/// A unique identifier for a game room (one matched pair of players).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Room logic returns `(Recipient, ServerEvent)` pairs and the room actor
/// delivers each one to the right outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Both players in the room.
    All,

    /// One specific player.
    Player(PlayerId),

    /// Everyone except the given player (in a two-seat room: the opponent).
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is among the recipients.
    pub fn includes(self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(p) => p == player,
            Self::AllExcept(p) => p != player,
        }
    }
}
