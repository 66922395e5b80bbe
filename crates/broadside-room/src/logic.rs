//! The game rules for one room, as a pure state machine.
//!
//! [`Battle`] owns both players' boards and the turn. It never touches a
//! channel or a socket: every method takes a command and returns the
//! events to deliver, each paired with a [`Recipient`]. The room actor
//! feeds it commands one at a time, which is what serializes the two
//! players' messages.

use broadside_board::{Board, BoardError, Coord, FLEET, Ship};
use broadside_protocol::{
    AttackReport, ClientCommand, PlayerId, Recipient, RoomId, ServerEvent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{RoomConfig, RoomError, RoomState};

/// Events produced by one step of the state machine.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One player's side of the table.
#[derive(Debug, Clone)]
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    board: Board,
    ready: bool,
}

impl Seat {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            board: Board::new(),
            ready: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// `true` once the player's fleet is committed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

// ---------------------------------------------------------------------------
// Battle
// ---------------------------------------------------------------------------

/// Two seats, two boards, and whose turn it is.
///
/// Seat 0 is the player who waited longest in matchmaking; they take the
/// first turn.
pub struct Battle {
    room_id: RoomId,
    seats: [Seat; 2],
    state: RoomState,
    turn: usize,
    max_chat_length: usize,
    rng: StdRng,
}

impl Battle {
    /// Creates a battle in `AwaitingPlacement` with empty boards.
    pub fn new(
        room_id: RoomId,
        first: (PlayerId, String),
        second: (PlayerId, String),
        config: &RoomConfig,
    ) -> Self {
        Self::with_rng(room_id, first, second, config, StdRng::from_os_rng())
    }

    /// Like [`new`](Self::new) with a fixed random source, so random
    /// placement is reproducible.
    pub fn with_rng(
        room_id: RoomId,
        first: (PlayerId, String),
        second: (PlayerId, String),
        config: &RoomConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            room_id,
            seats: [Seat::new(first.0, first.1), Seat::new(second.0, second.1)],
            state: RoomState::AwaitingPlacement,
            turn: 0,
            max_chat_length: config.max_chat_length,
            rng,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn players(&self) -> [PlayerId; 2] {
        [self.seats[0].id, self.seats[1].id]
    }

    pub fn seat(&self, player: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == player)
    }

    /// The player whose attacks are valid, while the game is running.
    pub fn turn_holder(&self) -> Option<PlayerId> {
        self.state.is_active().then(|| self.seats[self.turn].id)
    }

    fn index_of(&self, player: PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| s.id == player)
    }

    /// MATCH_FOUND for both players, each naming the other.
    pub fn opening(&self) -> Outbox {
        vec![
            (
                Recipient::Player(self.seats[0].id),
                ServerEvent::MatchFound {
                    opponent_name: self.seats[1].name.clone(),
                },
            ),
            (
                Recipient::Player(self.seats[1].id),
                ServerEvent::MatchFound {
                    opponent_name: self.seats[0].name.clone(),
                },
            ),
        ]
    }

    /// Applies one command from `sender`.
    ///
    /// Rejections that the client should hear about come back as an
    /// `ERROR` event; stale or out-of-turn attacks are dropped with no
    /// events at all.
    ///
    /// # Errors
    /// [`RoomError::Invariant`] if a board turns out to be internally
    /// inconsistent. The room cannot continue after that.
    pub fn handle(
        &mut self,
        sender: PlayerId,
        cmd: ClientCommand,
    ) -> Result<Outbox, RoomError> {
        let Some(seat) = self.index_of(sender) else {
            tracing::warn!(room_id = %self.room_id, %sender, "command from non-member, ignoring");
            return Ok(Vec::new());
        };
        if self.state.is_over() {
            tracing::debug!(room_id = %self.room_id, %sender, "room is over, ignoring command");
            return Ok(Vec::new());
        }

        let events = match cmd {
            ClientCommand::ShipPlacement { ships } => self.submit_fleet(seat, &ships),
            ClientCommand::PlaceShipsRandomly => self.randomize_fleet(seat),
            ClientCommand::AllShipsPlaced => self.confirm_fleet(seat),
            ClientCommand::Attack { target } => return self.attack(seat, target),
            ClientCommand::LeaveGame { .. } => self.depart(seat, true),
            ClientCommand::ChatMessage { text } => self.chat(seat, &text),
            ClientCommand::Join { .. } => reply(sender, "already in a game"),
        };
        Ok(events)
    }

    /// The player's connection dropped.
    pub fn disconnect(&mut self, player: PlayerId) -> Outbox {
        match self.index_of(player) {
            Some(seat) if !self.state.is_over() => self.depart(seat, false),
            _ => Vec::new(),
        }
    }

    /// Ends the game because the room hit an internal error.
    pub fn abort(&mut self, reason: &str) -> Outbox {
        if self.state.is_over() {
            return Vec::new();
        }
        self.state = RoomState::Over { abnormal: true };
        vec![(
            Recipient::All,
            ServerEvent::error(format!("game aborted: {reason}")),
        )]
    }

    // -- Placement ----------------------------------------------------------

    fn placement_closed(&self, seat: usize) -> Option<Outbox> {
        self.seats[seat]
            .ready
            .then(|| reply(self.seats[seat].id, "fleet already confirmed"))
    }

    fn submit_fleet(&mut self, seat: usize, ships: &[Ship]) -> Outbox {
        if let Some(rejected) = self.placement_closed(seat) {
            return rejected;
        }
        let player = self.seats[seat].id;
        match Board::with_fleet(ships) {
            Ok(board) => {
                self.seats[seat].board = board;
                let mut events = vec![self.confirmation(seat)];
                events.extend(self.mark_ready(seat));
                events
            }
            Err(e) => {
                tracing::debug!(room_id = %self.room_id, %player, error = %e, "fleet rejected");
                reply(player, format!("invalid fleet: {e}"))
            }
        }
    }

    fn randomize_fleet(&mut self, seat: usize) -> Outbox {
        if let Some(rejected) = self.placement_closed(seat) {
            return rejected;
        }
        let player = self.seats[seat].id;
        match self.seats[seat].board.place_ships_randomly(&mut self.rng) {
            Ok(()) => vec![self.confirmation(seat)],
            Err(e) => {
                tracing::warn!(room_id = %self.room_id, %player, error = %e, "random placement failed");
                reply(player, "random placement failed, try again")
            }
        }
    }

    fn confirm_fleet(&mut self, seat: usize) -> Outbox {
        if self.seats[seat].ready {
            return Vec::new();
        }
        if !self.seats[seat].board.fleet_complete() {
            return reply(self.seats[seat].id, "no complete fleet placed");
        }
        self.mark_ready(seat)
    }

    fn confirmation(&self, seat: usize) -> (Recipient, ServerEvent) {
        (
            Recipient::Player(self.seats[seat].id),
            ServerEvent::ShipPlacementConfirmed {
                ships: self.seats[seat].board.ships().to_vec(),
            },
        )
    }

    fn mark_ready(&mut self, seat: usize) -> Outbox {
        self.seats[seat].ready = true;
        let player = self.seats[seat].id;
        tracing::info!(room_id = %self.room_id, %player, "fleet confirmed");

        let mut events = vec![(
            Recipient::AllExcept(player),
            ServerEvent::ShipPlaced {
                ships_placed: FLEET.len(),
            },
        )];

        if self.seats.iter().all(|s| s.ready) {
            self.state = RoomState::InProgress;
            self.turn = 0;
            tracing::info!(room_id = %self.room_id, first = %self.seats[0].id, "game started");
            events.push((
                Recipient::Player(self.seats[0].id),
                ServerEvent::GameStart { your_turn: true },
            ));
            events.push((
                Recipient::Player(self.seats[1].id),
                ServerEvent::GameStart { your_turn: false },
            ));
        }
        events
    }

    // -- Attacks ------------------------------------------------------------

    fn attack(&mut self, seat: usize, target: Coord) -> Result<Outbox, RoomError> {
        let attacker = self.seats[seat].id;
        if !self.state.is_active() || seat != self.turn {
            tracing::warn!(room_id = %self.room_id, %attacker, %target, "attack out of turn, ignoring");
            return Ok(Vec::new());
        }
        let defender = 1 - seat;
        if !self.seats[defender].board.is_attackable(target) {
            tracing::warn!(room_id = %self.room_id, %attacker, %target, "cell already resolved, ignoring");
            return Ok(Vec::new());
        }

        let outcome = match self.seats[defender].board.attack(target) {
            Ok(outcome) => outcome,
            Err(e @ BoardError::OrphanCell(_)) => {
                return Err(RoomError::Invariant {
                    room_id: self.room_id,
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(room_id = %self.room_id, %attacker, error = %e, "attack rejected");
                return Ok(Vec::new());
            }
        };
        tracing::debug!(
            room_id = %self.room_id,
            %attacker,
            %target,
            hit = outcome.hit,
            sunk = outcome.sunk,
            "attack resolved"
        );

        let mut events = vec![(
            Recipient::All,
            ServerEvent::AttackResult(AttackReport {
                target,
                hit: outcome.hit,
                sunk: outcome.sunk,
                game_over: outcome.game_over,
                attacker_id: attacker,
                sunk_ship: outcome.sunk_ship,
                blocked: outcome.blocked,
            }),
        )];

        let defender_id = self.seats[defender].id;
        if outcome.game_over {
            self.state = RoomState::Over { abnormal: false };
            tracing::info!(room_id = %self.room_id, winner = %attacker, "game over");
            events.push((
                Recipient::All,
                ServerEvent::GameOver {
                    winner: self.seats[seat].name.clone(),
                },
            ));
        } else if outcome.hit {
            events.push((Recipient::Player(attacker), ServerEvent::YourTurnAgain));
            events.push((Recipient::Player(defender_id), ServerEvent::OpponentTurn));
        } else {
            self.turn = defender;
            events.push((Recipient::Player(defender_id), ServerEvent::YourTurn));
            events.push((Recipient::Player(attacker), ServerEvent::OpponentTurn));
        }
        Ok(events)
    }

    // -- Leaving and chat ---------------------------------------------------

    fn depart(&mut self, seat: usize, voluntary: bool) -> Outbox {
        self.state = RoomState::Over { abnormal: true };
        let leaver = &self.seats[seat];
        let remaining = self.seats[1 - seat].id;
        tracing::info!(room_id = %self.room_id, player = %leaver.id, voluntary, "player left the room");

        let event = if voluntary {
            ServerEvent::OpponentLeft {
                message: format!("{} left the game", leaver.name),
            }
        } else {
            ServerEvent::OpponentDisconnected {
                message: format!("{} disconnected", leaver.name),
            }
        };
        vec![(Recipient::Player(remaining), event)]
    }

    fn chat(&self, seat: usize, text: &str) -> Outbox {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let text = match text.char_indices().nth(self.max_chat_length) {
            Some((cut, _)) => &text[..cut],
            None => text,
        };
        let sender = &self.seats[seat];
        vec![(
            Recipient::AllExcept(sender.id),
            ServerEvent::ChatMessageReceived {
                sender: sender.name.clone(),
                text: text.to_string(),
            },
        )]
    }
}

fn reply(player: PlayerId, message: impl Into<String>) -> Outbox {
    vec![(Recipient::Player(player), ServerEvent::error(message))]
}

// =========================================================================
// Tests
// =========================================================================
