//! Wire protocol for Broadside.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Envelope** ([`Message`]): a command word plus key/value data, the
//!   shape every line on the wire has.
//! - **Codec** ([`codec::encode`], [`codec::decode`]): pure functions that
//!   turn a [`Message`] into one `TYPE:k=v;k=v\n` line and back.
//! - **Typed vocabulary** ([`ClientCommand`], [`ServerEvent`]): one variant
//!   per command, so layers above never handle raw string maps.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw lines) and the room
//! logic. It doesn't know about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (Message → ClientCommand) → Room
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod codec;
mod command;
mod error;
mod message;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use command::{
    AttackReport, ClientCommand, ServerEvent, commands, join_coords, keys,
    parse_coords,
};
pub use error::ProtocolError;
pub use message::Message;
pub use types::{PlayerId, Recipient, RoomId};

/// Decodes one line straight into a [`ClientCommand`].
///
/// Convenience for the server's read loop: `codec::decode` followed by
/// `TryFrom`.
pub fn decode_command(line: &[u8]) -> Result<ClientCommand, ProtocolError> {
    ClientCommand::try_from(&codec::decode(line)?)
}

/// Decodes one line straight into a [`ServerEvent`].
pub fn decode_event(line: &[u8]) -> Result<ServerEvent, ProtocolError> {
    ServerEvent::try_from(&codec::decode(line)?)
}

/// Encodes a [`ServerEvent`] as a wire line.
pub fn encode_event(event: &ServerEvent) -> String {
    codec::encode(&Message::from(event))
}

/// Encodes a [`ClientCommand`] as a wire line.
pub fn encode_command(cmd: &ClientCommand) -> String {
    codec::encode(&Message::from(cmd))
}
