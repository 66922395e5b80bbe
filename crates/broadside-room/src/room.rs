//! Room actor: an isolated Tokio task that owns one [`Battle`].
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model": no shared mutable
//! state, just message passing. Because the actor handles one command at
//! a time, two players' messages can never race on the same board or
//! turn.

use std::collections::HashMap;

use broadside_protocol::{ClientCommand, PlayerId, RoomId, ServerEvent};
use tokio::sync::{mpsc, oneshot};

use crate::logic::{Battle, Outbox};
use crate::{Entrant, RoomConfig, RoomError, RoomState};

/// Channel sender for delivering events to a player's connection handler.
///
/// Unbounded so the actor never waits on a slow client; the connection's
/// writer task drains it in order.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in `GetInfo` is a "reply channel": the caller
/// sends the command and waits for the response on it.
pub(crate) enum RoomCommand {
    /// A command from one of the seated players.
    Message {
        sender: PlayerId,
        cmd: ClientCommand,
    },

    /// A seated player's connection ended.
    Disconnect { player_id: PlayerId },

    /// Request a snapshot of the room.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Stop the room, treating both players as disconnected.
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub state: RoomState,
    /// Seat order: the first player takes the first turn.
    pub players: [PlayerId; 2],
    pub turn_holder: Option<PlayerId>,
}

/// Sent by a room actor as it exits, so the owner can forget the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomClosed {
    pub room_id: RoomId,
    pub players: [PlayerId; 2],
    pub state: RoomState,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone; it's just an `mpsc::Sender` wrapper. The
/// [`RoomManager`](crate::RoomManager) holds one per room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    players: [PlayerId; 2],
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's unique ID.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// The two seated players, first turn first.
    pub fn players(&self) -> [PlayerId; 2] {
        self.players
    }

    /// Returns `true` once the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Delivers a player's command to the room.
    ///
    /// Returns once the command is queued, not once it is handled.
    pub async fn send_command(
        &self,
        sender: PlayerId,
        cmd: ClientCommand,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Message { sender, cmd }).await
    }

    /// Reports that a player's connection ended.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect { player_id }).await
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    battle: Battle,
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
    closed: mpsc::UnboundedSender<RoomClosed>,
}

impl RoomActor {
    /// Runs the actor loop until the game is over or the room is shut down.
    async fn run(mut self) {
        let room_id = self.battle.room_id();
        tracing::info!(%room_id, "room actor started");
        self.dispatch(self.battle.opening());

        while let Some(cmd) = self.receiver.recv().await {
            let events = match cmd {
                RoomCommand::Message { sender, cmd } => {
                    tracing::debug!(%room_id, %sender, command = cmd.name(), "room command");
                    match self.battle.handle(sender, cmd) {
                        Ok(events) => events,
                        Err(e) => {
                            tracing::error!(%room_id, error = %e, "room invariant violated");
                            self.battle.abort("internal error")
                        }
                    }
                }
                RoomCommand::Disconnect { player_id } => self.battle.disconnect(player_id),
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                    Outbox::new()
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_id, "room shutting down");
                    let mut events = Outbox::new();
                    for player in self.battle.players() {
                        events.extend(self.battle.disconnect(player));
                    }
                    events
                }
            };

            let over = self.battle.state().is_over();
            if over {
                // Handles must read as closed before the final events
                // reach the players, so a JOIN sent in reply is accepted.
                self.receiver.close();
            }
            self.dispatch(events);
            if over {
                break;
            }
        }

        let _ = self.closed.send(RoomClosed {
            room_id,
            players: self.battle.players(),
            state: self.battle.state(),
        });
        tracing::info!(%room_id, state = %self.battle.state(), "room actor stopped");
    }

    /// Dispatches outbound events to the correct recipients.
    fn dispatch(&self, events: Outbox) {
        for (recipient, event) in events {
            for (player, sender) in &self.senders {
                if recipient.includes(*player) {
                    // A closed receiver means the player's connection is
                    // gone; its Disconnect is already on the way.
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.battle.room_id(),
            state: self.battle.state(),
            players: self.battle.players(),
            turn_holder: self.battle.turn_holder(),
        }
    }
}

/// Spawns a room actor for two paired players and returns its handle.
///
/// `first` is seated first and takes the first turn. Both players receive
/// MATCH_FOUND before any other room event.
pub(crate) fn spawn_room(
    room_id: RoomId,
    first: Entrant,
    second: Entrant,
    config: &RoomConfig,
    closed: mpsc::UnboundedSender<RoomClosed>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let players = [first.player_id, second.player_id];

    let battle = Battle::new(
        room_id,
        (first.player_id, first.name),
        (second.player_id, second.name),
        config,
    );
    let senders = HashMap::from([
        (first.player_id, first.sender),
        (second.player_id, second.sender),
    ]);

    tokio::spawn(
        RoomActor {
            battle,
            senders,
            receiver: rx,
            closed,
        }
        .run(),
    );

    RoomHandle {
        room_id,
        players,
        sender: tx,
    }
}
