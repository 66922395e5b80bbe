//! The session manager: tracks every connected player.
//!
//! It is responsible for:
//! - Handing out player ids as connections arrive
//! - Recording display names when players JOIN
//! - Tracking whether each player is idle, queued, or in a room
//! - Releasing players back to idle when their room closes
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself; it uses a plain
//! `HashMap`. The server wraps it in a `tokio::sync::Mutex` and holds the
//! lock only for short, non-I/O sections.

use std::collections::HashMap;

use broadside_protocol::{PlayerId, RoomId};

use crate::{Session, SessionError, SessionState};

/// Registry of all connected players.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ join() ──→ mark_playing() ──→ release() ──→ join() ...
///    │            │               │               │
///    ▼            ▼               ▼               ▼
/// [Connected] [Matchmaking]   [Playing]      [Connected]
///
/// remove() from any state when the connection ends.
/// ```
pub struct SessionManager<H> {
    sessions: HashMap<PlayerId, Session<H>>,
    next_id: u64,
}

impl<H> Default for SessionManager<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SessionManager<H> {
    /// Creates an empty manager. The first player gets id 1.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a newly accepted connection and returns its player id.
    ///
    /// Ids are never reused within one manager.
    pub fn create(&mut self, handle: H) -> PlayerId {
        let player_id = PlayerId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(
            player_id,
            Session {
                player_id,
                name: None,
                state: SessionState::Connected,
                handle,
            },
        );
        tracing::debug!(%player_id, "session created");
        player_id
    }

    /// Records the player's display name and moves them to matchmaking.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if there is no such session
    /// - [`SessionError::AlreadyJoined`] if the player is already queued
    ///   or in a room
    pub fn join(
        &mut self,
        player_id: PlayerId,
        name: String,
    ) -> Result<&Session<H>, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if !session.state.can_join() {
            return Err(SessionError::AlreadyJoined(player_id));
        }
        tracing::info!(%player_id, %name, "player joined matchmaking");
        session.name = Some(name);
        session.state = SessionState::Matchmaking;
        Ok(session)
    }

    /// Records that the player was seated in `room_id`.
    pub fn mark_playing(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.state = SessionState::Playing(room_id);
        Ok(())
    }

    /// Returns the player to idle if they are still seated in `room_id`.
    ///
    /// Returns `true` if the state changed. A player who already left (or
    /// was re-queued) is not touched.
    pub fn release(&mut self, player_id: PlayerId, room_id: RoomId) -> bool {
        match self.sessions.get_mut(&player_id) {
            Some(session) if session.state == SessionState::Playing(room_id) => {
                session.state = SessionState::Connected;
                true
            }
            _ => false,
        }
    }

    /// Releases every player seated in `room_id`. Returns who was released.
    pub fn release_room(&mut self, room_id: RoomId) -> Vec<PlayerId> {
        let mut released = Vec::new();
        for session in self.sessions.values_mut() {
            if session.state == SessionState::Playing(room_id) {
                session.state = SessionState::Connected;
                released.push(session.player_id);
            }
        }
        if !released.is_empty() {
            tracing::debug!(%room_id, count = released.len(), "players released from room");
        }
        released
    }

    /// Removes a session entirely. Called when its connection ends.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Session<H>> {
        let removed = self.sessions.remove(&player_id);
        if removed.is_some() {
            tracing::debug!(%player_id, "session removed");
        }
        removed
    }

    /// Looks up a session.
    pub fn get(&self, player_id: PlayerId) -> Option<&Session<H>> {
        self.sessions.get(&player_id)
    }

    /// The player's current state, if connected.
    pub fn state(&self, player_id: PlayerId) -> Option<SessionState> {
        self.sessions.get(&player_id).map(|s| s.state)
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<H: Clone> SessionManager<H> {
    /// Clones every connection handle, e.g. to close them all at shutdown.
    pub fn handles(&self) -> Vec<H> {
        self.sessions.values().map(|s| s.handle.clone()).collect()
    }
}

// =========================================================================
// Tests
// =========================================================================
