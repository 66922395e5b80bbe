//! Line-framed TCP transport using `tokio::net`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{Mutex, watch};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Longest line accepted by default, excluding the newline.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpLineTransport {
    listener: TcpListener,
    max_line_length: usize,
}

impl TcpLineTransport {
    /// Binds a new transport to the given address.
    ///
    /// Bind to port 0 to let the OS pick one, then read it back with
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(%local, "TCP transport listening");
        }
        Ok(Self {
            listener,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        })
    }

    /// Sets the line length limit for connections accepted from now on.
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

impl Transport for TcpLineTransport {
    type Connection = TcpLineConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpLineConnection::from_stream(stream, self.max_line_length);
        tracing::debug!(id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        // The listener closes when the transport is dropped; the server
        // stops calling `accept` before that.
        Ok(())
    }
}

/// A single line-framed TCP connection.
///
/// Reads and writes use separate halves behind separate locks, so a task
/// blocked in [`recv`](Connection::recv) never stalls a sender. Writes
/// from concurrent callers are serialized by the writer lock and never
/// interleave within a line.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    max_line_length: usize,
    closed: AtomicBool,
    close_signal: watch::Sender<bool>,
}

impl TcpLineConnection {
    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, max_line_length: usize) -> Self {
        let peer = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }
        let (read, write) = stream.into_split();
        let (close_signal, _) = watch::channel(false);
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            peer,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
            max_line_length,
            closed: AtomicBool::new(false),
            close_signal,
        }
    }

    /// Opens a client connection to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        Ok(Self::from_stream(stream, DEFAULT_MAX_LINE_LENGTH))
    }

    /// The remote address, if the OS reported one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    async fn read_line(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        let mut line = Vec::new();
        // One extra byte so "exactly at the limit, then newline" still fits.
        let budget = self.max_line_length as u64 + 1;
        let n = (&mut *reader)
            .take(budget)
            .read_until(b'\n', &mut line)
            .await
            .map_err(TransportError::ReceiveFailed)?;

        if n == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        } else if line.len() > self.max_line_length {
            return Err(TransportError::FrameTooLong {
                limit: self.max_line_length,
            });
        }
        // Otherwise the peer closed mid-line; hand up what arrived.
        Ok(Some(line))
    }
}

impl Connection for TcpLineConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut closed = self.close_signal.subscribe();
        if self.is_closed() {
            return Ok(None);
        }
        tokio::select! {
            line = self.read_line() => line,
            _ = closed.wait_for(|closed| *closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.close_signal.send_replace(true);

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(id = %self.id, error = %e, "shutdown after close");
        }
        tracing::debug!(id = %self.id, "connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
