//! Typed commands and events.
//!
//! The wire carries a stringly-typed [`Message`]. The connection handler
//! converts it into one of the enums here as soon as a line arrives, so the
//! room logic never sees a raw key/value map:
//!
//! ```text
//!   line ──codec::decode──→ Message ──TryFrom──→ ClientCommand   (inbound)
//!   ServerEvent ──From──→ Message ──codec::encode──→ line         (outbound)
//! ```
//!
//! The reverse conversions exist too, so a client can speak the same
//! vocabulary from the other end of the socket.

use std::str::FromStr;

use broadside_board::{Coord, Ship};

use crate::{Message, PlayerId, ProtocolError};

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Command words, as they appear before the `:` on the wire.
pub mod commands {
    pub const JOIN: &str = "JOIN";
    pub const JOINED: &str = "JOINED";
    pub const MATCH_FOUND: &str = "MATCH_FOUND";
    pub const SHIP_PLACEMENT: &str = "SHIP_PLACEMENT";
    pub const PLACE_SHIPS_RANDOMLY: &str = "PLACE_SHIPS_RANDOMLY";
    pub const SHIP_PLACEMENT_CONFIRMED: &str = "SHIP_PLACEMENT_CONFIRMED";
    pub const SHIP_PLACED: &str = "SHIP_PLACED";
    pub const ALL_SHIPS_PLACED: &str = "ALL_SHIPS_PLACED";
    pub const GAME_START: &str = "GAME_START";
    pub const ATTACK: &str = "ATTACK";
    pub const ATTACK_RESULT: &str = "ATTACK_RESULT";
    pub const YOUR_TURN: &str = "YOUR_TURN";
    pub const YOUR_TURN_AGAIN: &str = "YOUR_TURN_AGAIN";
    pub const OPPONENT_TURN: &str = "OPPONENT_TURN";
    pub const GAME_OVER: &str = "GAME_OVER";
    pub const LEAVE_GAME: &str = "LEAVE_GAME";
    pub const OPPONENT_LEFT: &str = "OPPONENT_LEFT";
    pub const OPPONENT_DISCONNECTED: &str = "OPPONENT_DISCONNECTED";
    pub const CHAT_MESSAGE: &str = "CHAT_MESSAGE";
    pub const CHAT_MESSAGE_RECEIVED: &str = "CHAT_MESSAGE_RECEIVED";
    pub const ERROR: &str = "ERROR";
}

/// Field keys.
pub mod keys {
    pub const NAME: &str = "name";
    pub const PLAYER_NAME: &str = "player_name";
    pub const PLAYER_ID: &str = "player_id";
    pub const OPPONENT_NAME: &str = "opponent_name";
    pub const SHIPS_PLACED: &str = "ships_placed";
    pub const YOUR_TURN: &str = "your_turn";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const HIT: &str = "hit";
    pub const SUNK: &str = "sunk";
    pub const GAME_OVER: &str = "game_over";
    pub const ATTACKER_ID: &str = "attacker_id";
    pub const SUNK_SHIP_POSITIONS: &str = "sunk_ship_positions";
    pub const BLOCKED_CELLS: &str = "blocked_cells";
    pub const WINNER: &str = "winner";
    pub const MESSAGE: &str = "message";
    pub const TEXT: &str = "text";
    pub const SENDER: &str = "sender";

    /// `shipN_size`, `shipN_horizontal` and `shipN_positions`.
    pub fn ship_size(n: usize) -> String {
        format!("ship{n}_size")
    }

    pub fn ship_horizontal(n: usize) -> String {
        format!("ship{n}_horizontal")
    }

    pub fn ship_positions(n: usize) -> String {
        format!("ship{n}_positions")
    }
}

// ---------------------------------------------------------------------------
// ClientCommand
// ---------------------------------------------------------------------------

/// Everything a client may send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Enter matchmaking. `None` means "use the server's default name".
    Join { name: Option<String> },

    /// Submit a complete fleet with explicit positions.
    ShipPlacement { ships: Vec<Ship> },

    /// Ask the server to place the fleet at random.
    PlaceShipsRandomly,

    /// Confirm the fleet the server currently holds.
    AllShipsPlaced,

    Attack { target: Coord },

    /// Leave the room voluntarily. The id is informational; the server
    /// always acts on the sender's own connection.
    LeaveGame { player_id: Option<PlayerId> },

    ChatMessage { text: String },
}

impl ClientCommand {
    /// The command word this variant travels as.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => commands::JOIN,
            Self::ShipPlacement { .. } => commands::SHIP_PLACEMENT,
            Self::PlaceShipsRandomly => commands::PLACE_SHIPS_RANDOMLY,
            Self::AllShipsPlaced => commands::ALL_SHIPS_PLACED,
            Self::Attack { .. } => commands::ATTACK,
            Self::LeaveGame { .. } => commands::LEAVE_GAME,
            Self::ChatMessage { .. } => commands::CHAT_MESSAGE,
        }
    }
}

impl From<&ClientCommand> for Message {
    fn from(cmd: &ClientCommand) -> Self {
        let msg = Message::new(cmd.name());
        match cmd {
            ClientCommand::Join { name } => match name {
                Some(name) => msg.with(keys::NAME, name),
                None => msg,
            },
            ClientCommand::ShipPlacement { ships } => write_ships(msg, ships),
            ClientCommand::PlaceShipsRandomly | ClientCommand::AllShipsPlaced => msg,
            ClientCommand::Attack { target } => {
                msg.with(keys::X, target.x).with(keys::Y, target.y)
            }
            ClientCommand::LeaveGame { player_id } => match player_id {
                Some(id) => msg.with(keys::PLAYER_ID, id.0),
                None => msg,
            },
            ClientCommand::ChatMessage { text } => msg.with(keys::TEXT, text),
        }
    }
}

impl TryFrom<&Message> for ClientCommand {
    type Error = ProtocolError;

    fn try_from(msg: &Message) -> Result<Self, Self::Error> {
        let cmd = match msg.kind() {
            commands::JOIN => Self::Join {
                name: msg.get(keys::NAME).map(str::to_string),
            },
            commands::SHIP_PLACEMENT => Self::ShipPlacement {
                ships: read_ships(msg)?,
            },
            commands::PLACE_SHIPS_RANDOMLY => Self::PlaceShipsRandomly,
            commands::ALL_SHIPS_PLACED => Self::AllShipsPlaced,
            commands::ATTACK => Self::Attack {
                target: read_target(msg)?,
            },
            commands::LEAVE_GAME => Self::LeaveGame {
                player_id: msg
                    .get(keys::PLAYER_ID)
                    .map(|v| {
                        v.parse()
                            .map_err(|_| invalid(msg, keys::PLAYER_ID, v))
                    })
                    .transpose()?,
            },
            commands::CHAT_MESSAGE => Self::ChatMessage {
                text: required(msg, keys::TEXT)?.to_string(),
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// The broadcast payload of an `ATTACK_RESULT`.
///
/// Both players receive the same report; `attacker_id` tells each side
/// whether it was their shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub target: Coord,
    pub hit: bool,
    pub sunk: bool,
    pub game_over: bool,
    pub attacker_id: PlayerId,
    /// Every cell of the sunk ship. Only sent when `sunk`.
    pub sunk_ship: Vec<Coord>,
    /// Cells newly blocked by the sinking. Only sent when `sunk`.
    pub blocked: Vec<Coord>,
}

/// Everything the server may send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Joined {
        player_name: String,
        player_id: PlayerId,
    },
    MatchFound {
        opponent_name: String,
    },
    /// The fleet the server now holds for the receiving player.
    ShipPlacementConfirmed {
        ships: Vec<Ship>,
    },
    /// The opponent has committed their fleet.
    ShipPlaced {
        ships_placed: usize,
    },
    GameStart {
        your_turn: bool,
    },
    AttackResult(AttackReport),
    YourTurn,
    YourTurnAgain,
    OpponentTurn,
    GameOver {
        winner: String,
    },
    OpponentLeft {
        message: String,
    },
    OpponentDisconnected {
        message: String,
    },
    ChatMessageReceived {
        sender: String,
        text: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Shorthand for an `ERROR` reply.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// The command word this variant travels as.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Joined { .. } => commands::JOINED,
            Self::MatchFound { .. } => commands::MATCH_FOUND,
            Self::ShipPlacementConfirmed { .. } => commands::SHIP_PLACEMENT_CONFIRMED,
            Self::ShipPlaced { .. } => commands::SHIP_PLACED,
            Self::GameStart { .. } => commands::GAME_START,
            Self::AttackResult(_) => commands::ATTACK_RESULT,
            Self::YourTurn => commands::YOUR_TURN,
            Self::YourTurnAgain => commands::YOUR_TURN_AGAIN,
            Self::OpponentTurn => commands::OPPONENT_TURN,
            Self::GameOver { .. } => commands::GAME_OVER,
            Self::OpponentLeft { .. } => commands::OPPONENT_LEFT,
            Self::OpponentDisconnected { .. } => commands::OPPONENT_DISCONNECTED,
            Self::ChatMessageReceived { .. } => commands::CHAT_MESSAGE_RECEIVED,
            ServerEvent::Error { .. } => commands::ERROR,
        }
    }
}

impl From<&ServerEvent> for Message {
    fn from(event: &ServerEvent) -> Self {
        let msg = Message::new(event.name());
        match event {
            ServerEvent::Joined {
                player_name,
                player_id,
            } => msg
                .with(keys::PLAYER_NAME, player_name)
                .with(keys::PLAYER_ID, player_id.0),
            ServerEvent::MatchFound { opponent_name } => {
                msg.with(keys::OPPONENT_NAME, opponent_name)
            }
            ServerEvent::ShipPlacementConfirmed { ships } => {
                write_ships(msg.with(keys::SHIPS_PLACED, ships.len()), ships)
            }
            ServerEvent::ShipPlaced { ships_placed } => {
                msg.with(keys::SHIPS_PLACED, ships_placed)
            }
            ServerEvent::GameStart { your_turn } => msg.with(keys::YOUR_TURN, your_turn),
            ServerEvent::AttackResult(report) => {
                let msg = msg
                    .with(keys::X, report.target.x)
                    .with(keys::Y, report.target.y)
                    .with(keys::HIT, report.hit)
                    .with(keys::SUNK, report.sunk)
                    .with(keys::GAME_OVER, report.game_over)
                    .with(keys::ATTACKER_ID, report.attacker_id.0);
                if report.sunk {
                    msg.with(keys::SUNK_SHIP_POSITIONS, join_coords(&report.sunk_ship))
                        .with(keys::BLOCKED_CELLS, join_coords(&report.blocked))
                } else {
                    msg
                }
            }
            ServerEvent::YourTurn | ServerEvent::YourTurnAgain | ServerEvent::OpponentTurn => msg,
            ServerEvent::GameOver { winner } => msg.with(keys::WINNER, winner),
            ServerEvent::OpponentLeft { message }
            | ServerEvent::OpponentDisconnected { message }
            | ServerEvent::Error { message } => msg.with(keys::MESSAGE, message),
            ServerEvent::ChatMessageReceived { sender, text } => {
                msg.with(keys::SENDER, sender).with(keys::TEXT, text)
            }
        }
    }
}

impl TryFrom<&Message> for ServerEvent {
    type Error = ProtocolError;

    fn try_from(msg: &Message) -> Result<Self, ProtocolError> {
        let event = match msg.kind() {
            commands::JOINED => Self::Joined {
                player_name: required(msg, keys::PLAYER_NAME)?.to_string(),
                player_id: parse_field(msg, keys::PLAYER_ID)?,
            },
            commands::MATCH_FOUND => Self::MatchFound {
                opponent_name: required(msg, keys::OPPONENT_NAME)?.to_string(),
            },
            commands::SHIP_PLACEMENT_CONFIRMED => Self::ShipPlacementConfirmed {
                ships: read_ships(msg)?,
            },
            commands::SHIP_PLACED => Self::ShipPlaced {
                ships_placed: parse_field(msg, keys::SHIPS_PLACED)?,
            },
            commands::GAME_START => Self::GameStart {
                your_turn: parse_bool(msg, keys::YOUR_TURN)?,
            },
            commands::ATTACK_RESULT => {
                let list = |key: &str| -> Result<Vec<Coord>, ProtocolError> {
                    match msg.get(key) {
                        Some(value) => {
                            parse_coords(value).map_err(|_| invalid(msg, key, value))
                        }
                        None => Ok(Vec::new()),
                    }
                };
                Self::AttackResult(AttackReport {
                    target: Coord::new(parse_field(msg, keys::X)?, parse_field(msg, keys::Y)?),
                    hit: parse_bool(msg, keys::HIT)?,
                    sunk: parse_bool(msg, keys::SUNK)?,
                    game_over: parse_bool(msg, keys::GAME_OVER)?,
                    attacker_id: parse_field(msg, keys::ATTACKER_ID)?,
                    sunk_ship: list(keys::SUNK_SHIP_POSITIONS)?,
                    blocked: list(keys::BLOCKED_CELLS)?,
                })
            }
            commands::YOUR_TURN => Self::YourTurn,
            commands::YOUR_TURN_AGAIN => Self::YourTurnAgain,
            commands::OPPONENT_TURN => Self::OpponentTurn,
            commands::GAME_OVER => Self::GameOver {
                winner: required(msg, keys::WINNER)?.to_string(),
            },
            commands::OPPONENT_LEFT => Self::OpponentLeft {
                message: optional_text(msg, keys::MESSAGE),
            },
            commands::OPPONENT_DISCONNECTED => Self::OpponentDisconnected {
                message: optional_text(msg, keys::MESSAGE),
            },
            commands::CHAT_MESSAGE_RECEIVED => Self::ChatMessageReceived {
                sender: required(msg, keys::SENDER)?.to_string(),
                text: required(msg, keys::TEXT)?.to_string(),
            },
            commands::ERROR => ServerEvent::Error {
                message: optional_text(msg, keys::MESSAGE),
            },
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn invalid(msg: &Message, key: &str, value: &str) -> ProtocolError {
    ProtocolError::InvalidField {
        command: msg.kind().to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn required<'a>(msg: &'a Message, key: &str) -> Result<&'a str, ProtocolError> {
    msg.get(key).ok_or_else(|| ProtocolError::MissingField {
        command: msg.kind().to_string(),
        key: key.to_string(),
    })
}

fn optional_text(msg: &Message, key: &str) -> String {
    msg.get(key).unwrap_or_default().to_string()
}

fn parse_field<T: FromStr>(msg: &Message, key: &str) -> Result<T, ProtocolError> {
    let value = required(msg, key)?;
    value.trim().parse().map_err(|_| invalid(msg, key, value))
}

/// Booleans are written as `true`/`false` and read case-insensitively.
fn parse_bool(msg: &Message, key: &str) -> Result<bool, ProtocolError> {
    let value = required(msg, key)?;
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(invalid(msg, key, value)),
    }
}

fn read_target(msg: &Message) -> Result<Coord, ProtocolError> {
    let target = Coord::new(parse_field(msg, keys::X)?, parse_field(msg, keys::Y)?);
    if !target.in_bounds() {
        return Err(invalid(msg, keys::X, &target.to_string()));
    }
    Ok(target)
}

/// Formats cells as `x:y,x:y`.
pub fn join_coords(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(Coord::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses an `x:y,x:y` list. An empty string is an empty list.
pub fn parse_coords(s: &str) -> Result<Vec<Coord>, broadside_board::ParseCoordError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

fn write_ships(mut msg: Message, ships: &[Ship]) -> Message {
    for (n, ship) in ships.iter().enumerate() {
        msg.insert(keys::ship_size(n), ship.size());
        msg.insert(keys::ship_horizontal(n), ship.is_horizontal());
        msg.insert(keys::ship_positions(n), join_coords(ship.positions()));
    }
    msg
}

/// Collects every `shipN_*` triple, ordered by `N`.
fn read_ships(msg: &Message) -> Result<Vec<Ship>, ProtocolError> {
    let mut indices: Vec<usize> = msg
        .fields()
        .filter_map(|(key, _)| {
            key.strip_prefix("ship")?
                .strip_suffix("_size")?
                .parse()
                .ok()
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();

    indices
        .into_iter()
        .map(|n| {
            let positions_key = keys::ship_positions(n);
            let positions = required(msg, &positions_key)?;
            Ok(Ship::with_positions(
                parse_field(msg, &keys::ship_size(n))?,
                parse_bool(msg, &keys::ship_horizontal(n))?,
                parse_coords(positions).map_err(|_| invalid(msg, &positions_key, positions))?,
            ))
        })
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
