//! Room configuration and state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a [`RoomManager`](crate::RoomManager)
/// spawns.
///
/// Deserializable so the server can read it straight out of its config
/// file; missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Capacity of each room actor's command channel. When full, senders
    /// wait (backpressure on a flooding client).
    pub channel_size: usize,

    /// Chat text longer than this many characters is truncated.
    pub max_chat_length: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            max_chat_length: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// AwaitingPlacement ──(both ready)──→ InProgress ──(fleet sunk)──→ Over
///         │                               │
///         └──────(leave / disconnect)─────┴──────────────────────→ Over { abnormal }
/// ```
///
/// There is no way back: once `Over`, the room is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Players are placing ships. Chat is allowed, attacks are not.
    AwaitingPlacement,

    /// Both fleets are placed and the turn-holder may attack.
    InProgress,

    /// The game ended. `abnormal` is set when it ended because a player
    /// left or disconnected rather than by sinking a fleet.
    Over { abnormal: bool },
}

impl RoomState {
    /// Returns `true` while attacks are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` once the room has ended for any reason.
    pub fn is_over(&self) -> bool {
        matches!(self, Self::Over { .. })
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::AwaitingPlacement, Self::InProgress) => true,
            (Self::AwaitingPlacement, Self::Over { abnormal }) => abnormal,
            (Self::InProgress, Self::Over { .. }) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingPlacement => write!(f, "AwaitingPlacement"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Over { abnormal: false } => write!(f, "Over"),
            Self::Over { abnormal: true } => write!(f, "Over(abnormal)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_can_transition_to() {
        use RoomState::*;
        assert!(AwaitingPlacement.can_transition_to(InProgress));
        assert!(AwaitingPlacement.can_transition_to(Over { abnormal: true }));
        assert!(!AwaitingPlacement.can_transition_to(Over { abnormal: false }));
        assert!(InProgress.can_transition_to(Over { abnormal: false }));
        assert!(InProgress.can_transition_to(Over { abnormal: true }));
        assert!(!InProgress.can_transition_to(AwaitingPlacement));
        assert!(!Over { abnormal: false }.can_transition_to(InProgress));
    }

    #[test]
    fn test_room_state_is_active_only_in_progress() {
        assert!(!RoomState::AwaitingPlacement.is_active());
        assert!(RoomState::InProgress.is_active());
        assert!(!RoomState::Over { abnormal: false }.is_active());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::AwaitingPlacement.to_string(), "AwaitingPlacement");
        assert_eq!(RoomState::Over { abnormal: true }.to_string(), "Over(abnormal)");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.max_chat_length, 512);
    }
}
