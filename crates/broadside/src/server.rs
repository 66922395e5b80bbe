//! `BroadsideServer` builder and server loop.
//!
//! This is the entry point for running a Broadside game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use broadside_room::{RoomClosed, RoomManager};
use broadside_session::SessionManager;
use broadside_transport::{Connection, TcpLineConnection, TcpLineTransport, Transport};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinSet;

use crate::handler::handle_connection;
use crate::{BroadsideError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The two
/// mutexes are never held at the same time.
pub(crate) struct ServerState {
    pub(crate) sessions: Mutex<SessionManager<Arc<TcpLineConnection>>>,
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) config: ServerConfig,
    /// Flips to `true` once when the server starts shutting down.
    pub(crate) shutdown: watch::Sender<bool>,
}

/// Builder for configuring and starting a Broadside server.
///
/// # Example
///
/// ```rust,ignore
/// use broadside::prelude::*;
///
/// let server = BroadsideServer::builder()
///     .bind("0.0.0.0:8889")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct BroadsideServerBuilder {
    bind_addr: Option<String>,
    config: ServerConfig,
}

impl BroadsideServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to, overriding the config's.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and prepares the server.
    ///
    /// Must be called inside a Tokio runtime: it spawns the task that
    /// tears down finished rooms.
    pub async fn build(self) -> Result<BroadsideServer, BroadsideError> {
        let mut config = self.config;
        if let Some(addr) = self.bind_addr {
            config.bind = addr;
        }

        let transport = TcpLineTransport::bind(config.bind.as_str())
            .await?
            .with_max_line_length(config.max_line_length);

        let (rooms, closed) = RoomManager::new(config.room_config());
        let (shutdown, _) = watch::channel(false);
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            rooms: Mutex::new(rooms),
            config,
            shutdown,
        });
        tokio::spawn(reap_rooms(Arc::downgrade(&state), closed));

        Ok(BroadsideServer { transport, state })
    }
}

impl Default for BroadsideServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Broadside game server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct BroadsideServer {
    transport: TcpLineTransport,
    state: Arc<ServerState>,
}

impl BroadsideServer {
    /// Creates a new builder.
    pub fn builder() -> BroadsideServerBuilder {
        BroadsideServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, BroadsideError> {
        Ok(self.transport.local_addr()?)
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BroadsideError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then shuts down
    /// gracefully.
    ///
    /// Shutdown stops accepting, tells every handler to stop reading (which
    /// sends its room down the disconnect path), closes the live
    /// connections, waits for the handlers to finish, and stops any room
    /// still running.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BroadsideError> {
        let Self {
            mut transport,
            state,
        } = self;
        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown);

        tracing::info!(addr = ?transport.local_addr().ok(), "Broadside server running");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        handlers.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },

                Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!(error = %e, "connection handler panicked");
                    }
                }
            }
        }

        tracing::info!("Broadside server shutting down");
        transport.shutdown().await?;
        drop(transport);

        // Handlers that have not registered their session yet see the flag
        // as soon as they start reading.
        state.shutdown.send_replace(true);
        let live = state.sessions.lock().await.handles();
        for conn in live {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "close during shutdown");
            }
        }
        while handlers.join_next().await.is_some() {}

        let rooms = state.rooms.lock().await.room_handles();
        for room in rooms {
            if let Err(e) = room.shutdown().await {
                tracing::debug!(room_id = %room.room_id(), error = %e, "room already stopped");
            }
        }
        tracing::info!("Broadside server stopped");
        Ok(())
    }
}

/// Forgets rooms as their actors exit and returns their players to idle.
///
/// Holds the state weakly so a dropped server lets this task end.
async fn reap_rooms(state: Weak<ServerState>, mut closed: mpsc::UnboundedReceiver<RoomClosed>) {
    while let Some(note) = closed.recv().await {
        let Some(state) = state.upgrade() else {
            break;
        };
        state.rooms.lock().await.close_room(note.room_id);
        let released = state.sessions.lock().await.release_room(note.room_id);
        tracing::info!(
            room_id = %note.room_id,
            state = %note.state,
            released = released.len(),
            "room closed"
        );
    }
}
