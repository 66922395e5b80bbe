//! Per-connection handler: JOIN, command routing, and teardown.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a session → the player gets an id
//!   2. Spawn the writer task → the only thing that writes to the socket
//!   3. Loop: receive lines → decode → JOIN goes to matchmaking, anything
//!      else goes to the player's room
//!   4. On EOF or error: tell the queue or room, drop the session, close

use std::sync::Arc;

use broadside_protocol::{
    ClientCommand, PlayerId, ProtocolError, ServerEvent, decode_command, encode_event,
};
use broadside_room::{Entrant, MatchOutcome, PlayerSender};
use broadside_session::{SessionState, display_name};
use broadside_transport::{Connection, TcpLineConnection};
use tokio::sync::mpsc;

use crate::BroadsideError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpLineConnection,
    state: Arc<ServerState>,
) -> Result<(), BroadsideError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let player_id = state.sessions.lock().await.create(Arc::clone(&conn));
    tracing::info!(%conn_id, %player_id, peer = ?conn.peer_addr(), "player connected");

    let (outbox, events) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), player_id, events));

    let result = read_loop(&conn, &state, player_id, &outbox).await;

    // --- Teardown ---
    let room = state.rooms.lock().await.disconnect(player_id);
    if let Some(handle) = room {
        if let Err(e) = handle.disconnect(player_id).await {
            tracing::debug!(%player_id, error = %e, "room already gone");
        }
    }
    state.sessions.lock().await.remove(player_id);
    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }
    writer.abort();
    tracing::info!(%player_id, "player disconnected");

    result
}

/// Drains the player's outbound queue onto the socket, one line per event.
async fn write_events(
    conn: Arc<TcpLineConnection>,
    player_id: PlayerId,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        let line = encode_event(&event);
        if let Err(e) = conn.send(line.as_bytes()).await {
            tracing::debug!(%player_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Reads lines until the peer goes away, the connection fails, or the
/// server starts shutting down.
async fn read_loop(
    conn: &TcpLineConnection,
    state: &ServerState,
    player_id: PlayerId,
    outbox: &PlayerSender,
) -> Result<(), BroadsideError> {
    let mut stopping = state.shutdown.subscribe();
    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            // Already-set flags resolve at once, so a handler spawned after
            // shutdown began still exits.
            _ = stopping.wait_for(|stop| *stop) => {
                tracing::info!(%player_id, "server shutting down");
                return Ok(());
            }
        };
        let line = match received {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let cmd = match decode_command(&line) {
            Ok(cmd) => cmd,
            Err(e) if deserves_reply(&e) => {
                tracing::debug!(%player_id, error = %e, "rejected command");
                reply(outbox, ServerEvent::error(e.to_string()));
                continue;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "dropping unparseable line");
                continue;
            }
        };

        match cmd {
            ClientCommand::Join { name } => join(state, player_id, name, outbox).await,
            other => route(state, player_id, other, outbox).await,
        }
    }
}

/// A known command with missing or bad fields is answered; noise is not.
fn deserves_reply(e: &ProtocolError) -> bool {
    matches!(
        e,
        ProtocolError::MissingField { .. } | ProtocolError::InvalidField { .. }
    )
}

fn reply(outbox: &PlayerSender, event: ServerEvent) {
    // Fails only once the writer is gone, i.e. the connection is closing.
    let _ = outbox.send(event);
}

/// JOIN: name the player, confirm, and hand them to matchmaking.
async fn join(
    state: &ServerState,
    player_id: PlayerId,
    requested: Option<String>,
    outbox: &PlayerSender,
) {
    let seated = state.rooms.lock().await.room_of(player_id).is_some();
    let name = display_name(requested.as_deref(), &state.config.default_player_name);

    {
        let mut sessions = state.sessions.lock().await;
        // A room that ended moments ago may not have been reaped yet.
        if !seated {
            if let Some(SessionState::Playing(room_id)) = sessions.state(player_id) {
                sessions.release(player_id, room_id);
            }
        }
        if let Err(e) = sessions.join(player_id, name.clone()) {
            tracing::warn!(%player_id, error = %e, "JOIN rejected");
            reply(outbox, ServerEvent::error(e.to_string()));
            return;
        }
    }

    reply(
        outbox,
        ServerEvent::Joined {
            player_name: name.clone(),
            player_id,
        },
    );

    let entrant = Entrant {
        player_id,
        name,
        sender: outbox.clone(),
    };
    let outcome = state.rooms.lock().await.enqueue(entrant);

    match outcome {
        Ok(MatchOutcome::Queued) => {
            tracing::debug!(%player_id, "waiting for an opponent");
        }
        Ok(MatchOutcome::Matched(handle)) => {
            let mut sessions = state.sessions.lock().await;
            for player in handle.players() {
                if let Err(e) = sessions.mark_playing(player, handle.room_id()) {
                    tracing::debug!(player_id = %player, error = %e, "player left before seating");
                }
            }
        }
        Err(e) => {
            tracing::warn!(%player_id, error = %e, "matchmaking rejected player");
            reply(outbox, ServerEvent::error(e.to_string()));
        }
    }
}

/// Any in-game command: forward it to the player's room.
async fn route(state: &ServerState, player_id: PlayerId, cmd: ClientCommand, outbox: &PlayerSender) {
    // Clone the handle out so the manager lock isn't held while the room's
    // channel applies backpressure.
    let seat = state.rooms.lock().await.seat_of(player_id);
    let handle = match seat {
        Ok(handle) => handle,
        Err(e) => {
            tracing::debug!(%player_id, command = cmd.name(), error = %e, "command outside a game");
            reply(outbox, ServerEvent::error("not in a game"));
            return;
        }
    };

    if let Err(e) = handle.send_command(player_id, cmd).await {
        tracing::debug!(%player_id, error = %e, "room went away");
        reply(outbox, ServerEvent::error("not in a game"));
    }
}
