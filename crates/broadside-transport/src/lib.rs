//! Transport abstraction layer for Broadside.
//!
//! Provides the [`Transport`] and [`Connection`] traits and their one
//! implementation, [`TcpLineTransport`]: plain TCP carrying
//! newline-terminated lines.
//!
//! A [`Connection`] deals in whole lines. What a line *means* is the
//! protocol crate's business.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{DEFAULT_MAX_LINE_LENGTH, TcpLineConnection, TcpLineTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that exchanges lines with its peer.
///
/// All methods take `&self`, so one connection can be shared (via `Arc`)
/// between a reading task and a writing task.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes `data` to the peer and flushes. The caller supplies the line
    /// terminator.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next line, without its terminator.
    ///
    /// Returns `Ok(None)` when the peer closed the stream or when
    /// [`close`](Connection::close) was called, including while this call
    /// was waiting.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    ///
    /// Idempotent: only the first call does anything, later calls return
    /// `Ok(())`.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns `true` once [`close`](Connection::close) has been called.
    fn is_closed(&self) -> bool;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
