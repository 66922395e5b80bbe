//! A minimal Broadside client.
//!
//! Speaks the same line protocol as the server: typed [`ClientCommand`]s
//! go out, typed [`ServerEvent`]s come back. A GUI front-end drives one of
//! these; the integration tests drive two.

use broadside_protocol::{ClientCommand, PlayerId, ServerEvent, decode_event, encode_command};
use broadside_transport::{Connection, TcpLineConnection, TransportError};
use tokio::net::ToSocketAddrs;

use crate::BroadsideError;

/// A connected, joined player.
pub struct BroadsideClient {
    conn: TcpLineConnection,
    player_id: PlayerId,
    name: String,
}

impl BroadsideClient {
    /// Connects, sends JOIN with `name`, and waits for JOINED.
    ///
    /// The server may normalize the name (trim, default); the confirmed
    /// one is available from [`name`](Self::name).
    ///
    /// # Errors
    /// [`BroadsideError::Rejected`] if the server answers with ERROR.
    pub async fn connect(addr: impl ToSocketAddrs, name: &str) -> Result<Self, BroadsideError> {
        let conn = TcpLineConnection::connect(addr).await?;
        let join = ClientCommand::Join {
            name: Some(name.to_string()),
        };
        conn.send(encode_command(&join).as_bytes()).await?;

        loop {
            let Some(event) = read_event(&conn).await? else {
                return Err(TransportError::ConnectionClosed(conn.id().to_string()).into());
            };
            match event {
                ServerEvent::Joined {
                    player_name,
                    player_id,
                } => {
                    tracing::debug!(%player_id, name = %player_name, "joined");
                    return Ok(Self {
                        conn,
                        player_id,
                        name: player_name,
                    });
                }
                ServerEvent::Error { message } => return Err(BroadsideError::Rejected(message)),
                other => {
                    tracing::debug!(event = other.name(), "ignoring event before JOINED");
                }
            }
        }
    }

    /// The id the server assigned.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// The display name the server confirmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends one command.
    pub async fn send(&self, cmd: &ClientCommand) -> Result<(), BroadsideError> {
        self.conn.send(encode_command(cmd).as_bytes()).await?;
        Ok(())
    }

    /// Waits for the next event. `None` once the server closes the
    /// connection.
    pub async fn recv(&self) -> Result<Option<ServerEvent>, BroadsideError> {
        read_event(&self.conn).await
    }

    /// Closes the connection. Safe to call more than once.
    pub async fn close(&self) -> Result<(), BroadsideError> {
        self.conn.close().await?;
        Ok(())
    }
}

async fn read_event(conn: &TcpLineConnection) -> Result<Option<ServerEvent>, BroadsideError> {
    loop {
        let Some(line) = conn.recv().await? else {
            return Ok(None);
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(Some(decode_event(&line)?));
    }
}
