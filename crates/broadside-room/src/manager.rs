//! Room manager: matchmaking, room creation, and routing players to rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use broadside_protocol::{PlayerId, RoomId};
use tokio::sync::mpsc;

use crate::room::spawn_room;
use crate::{Enqueued, Entrant, Matchmaker, RoomClosed, RoomConfig, RoomError, RoomHandle};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Result of a successful [`RoomManager::enqueue`].
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// No opponent yet; the player is waiting.
    Queued,

    /// The player was paired and a room is running.
    Matched(RoomHandle),
}

/// Owns the matchmaking queue and every active room, and tracks which
/// player is in which room.
///
/// This is the entry point for room operations from the server. It is
/// not thread-safe by itself; the server keeps it behind one mutex so
/// that pairing is a single atomic step.
pub struct RoomManager {
    config: RoomConfig,
    matchmaker: Matchmaker,

    /// Active rooms, keyed by room ID.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Maps each player to the room they're currently in.
    /// A player can be in at most ONE room at a time (key invariant).
    player_rooms: HashMap<PlayerId, RoomId>,

    /// Cloned into every room so it can announce its own end.
    closed_tx: mpsc::UnboundedSender<RoomClosed>,
}

impl RoomManager {
    /// Creates an empty manager.
    ///
    /// The returned receiver yields a [`RoomClosed`] each time a room
    /// actor exits; the owner should pass it back to
    /// [`close_room`](Self::close_room).
    pub fn new(config: RoomConfig) -> (Self, mpsc::UnboundedReceiver<RoomClosed>) {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let manager = Self {
            config,
            matchmaker: Matchmaker::new(),
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            closed_tx,
        };
        (manager, closed_rx)
    }

    /// Puts a player into matchmaking, pairing them if anyone is waiting.
    ///
    /// On a pairing the room is spawned before this returns, so both
    /// players are routable immediately.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`] if the player's room is still running
    /// - [`RoomError::AlreadyQueued`] if the player is already waiting
    pub fn enqueue(&mut self, entrant: Entrant) -> Result<MatchOutcome, RoomError> {
        if let Some(handle) = self.room_of(entrant.player_id) {
            return Err(RoomError::AlreadyInRoom(entrant.player_id, handle.room_id()));
        }

        match self.matchmaker.enqueue(entrant)? {
            Enqueued::Waiting => Ok(MatchOutcome::Queued),
            Enqueued::Paired { first, second } => {
                let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
                let players = [first.player_id, second.player_id];
                let handle = spawn_room(room_id, first, second, &self.config, self.closed_tx.clone());

                self.rooms.insert(room_id, handle.clone());
                for player in players {
                    self.player_rooms.insert(player, room_id);
                }
                tracing::info!(%room_id, first = %players[0], second = %players[1], "room created");
                Ok(MatchOutcome::Matched(handle))
            }
        }
    }

    /// The running room the player is seated in, if any.
    pub fn room_of(&self, player_id: PlayerId) -> Option<RoomHandle> {
        self.player_rooms
            .get(&player_id)
            .and_then(|room_id| self.rooms.get(room_id))
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// The room a player's in-game commands go to.
    ///
    /// Callers send on the returned handle after releasing whatever lock
    /// guards the manager, so one room's full channel never blocks others.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the player has no running room.
    pub fn seat_of(&self, player_id: PlayerId) -> Result<RoomHandle, RoomError> {
        self.room_of(player_id)
            .ok_or(RoomError::NotInRoom(player_id))
    }

    /// Handles a player's connection ending.
    ///
    /// A waiting player is taken out of the queue and `None` is returned.
    /// A seated player's room handle is returned so the caller can report
    /// the disconnect to it.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Option<RoomHandle> {
        if self.matchmaker.remove(player_id) {
            tracing::info!(%player_id, "waiting player left the queue");
            return None;
        }
        self.room_of(player_id)
    }

    /// Forgets a room that has ended and unseats its players.
    ///
    /// Returns the handle if the room was known.
    pub fn close_room(&mut self, room_id: RoomId) -> Option<RoomHandle> {
        let handle = self.rooms.remove(&room_id)?;
        self.player_rooms.retain(|_, rid| *rid != room_id);
        tracing::info!(%room_id, "room destroyed");
        Some(handle)
    }

    /// Returns cloned handles to all active rooms.
    ///
    /// Useful when callers need to perform async operations on rooms
    /// without holding the manager lock.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Players waiting for an opponent, oldest first.
    pub fn waiting(&self) -> Vec<PlayerId> {
        self.matchmaker.waiting()
    }

    pub fn is_waiting(&self, player_id: PlayerId) -> bool {
        self.matchmaker.contains(player_id)
    }
}
