//! Unified error type for the Broadside server and client.

use broadside_protocol::ProtocolError;
use broadside_room::RoomError;
use broadside_session::SessionError;
use broadside_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `broadside` crate, you deal with this single error type
/// instead of importing errors from each layer. The `#[from]` attribute on
/// each variant auto-generates `From` impls, so the `?` operator converts
/// layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BroadsideError {
    /// A transport-level error (bind, accept, send, recv, framing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed line, bad fields).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown player, duplicate JOIN).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not seated, room gone, invariant violated).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Reading the config file failed.
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`ServerConfig`](crate::ServerConfig).
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The server answered JOIN with something other than JOINED.
    #[error("join rejected: {0}")]
    Rejected(String),
}
