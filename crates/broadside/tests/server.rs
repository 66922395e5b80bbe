//! Integration tests for the Broadside server, handler, and full connection
//! flow over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use broadside::prelude::*;
use broadside::transport::{Connection, TcpLineConnection};
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// =========================================================================
// Helpers
// =========================================================================

const WAIT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), BroadsideError>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    async fn start_with(config: ServerConfig) -> Self {
        let server = BroadsideServer::builder()
            .config(config)
            .bind("127.0.0.1:0")
            .build()
            .await
            .expect("server should bind");
        let addr = server.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stopped.await;
        }));
        Self {
            addr,
            stop: Some(stop),
            task,
        }
    }

    async fn client(&self, name: &str) -> BroadsideClient {
        BroadsideClient::connect(self.addr, name)
            .await
            .expect("client should join")
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let result = tokio::time::timeout(WAIT, &mut self.task)
            .await
            .expect("server should stop")
            .expect("server task panicked");
        assert!(result.is_ok(), "server returned {result:?}");
    }
}

async fn next(client: &BroadsideClient) -> ServerEvent {
    tokio::time::timeout(WAIT, client.recv())
        .await
        .expect("timed out waiting for event")
        .expect("recv failed")
        .expect("server closed the connection")
}

/// Skips events until one matches.
async fn wait_for(client: &BroadsideClient, wanted: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        let event = next(client).await;
        if wanted(&event) {
            return event;
        }
    }
}

/// A valid, non-touching standard fleet.
fn fleet() -> Vec<Ship> {
    let h = |size: usize, x: u8, y: u8| {
        let cells = (0..size as u8).map(|i| Coord::new(x + i, y)).collect();
        Ship::with_positions(size, true, cells)
    };
    vec![
        h(4, 0, 0),
        h(3, 5, 0),
        h(3, 0, 2),
        h(2, 4, 2),
        h(2, 7, 2),
        h(2, 0, 4),
        h(1, 3, 4),
        h(1, 5, 4),
        h(1, 7, 4),
        h(1, 9, 4),
    ]
}

fn attack(x: u8, y: u8) -> ClientCommand {
    ClientCommand::Attack {
        target: Coord::new(x, y),
    }
}

/// Connects Ann then Bob and waits for both MATCH_FOUNDs.
async fn matched(server: &TestServer) -> (BroadsideClient, BroadsideClient) {
    let ann = server.client("Ann").await;
    let bob = server.client("Bob").await;
    assert_eq!(
        next(&ann).await,
        ServerEvent::MatchFound {
            opponent_name: "Bob".into()
        }
    );
    assert_eq!(
        next(&bob).await,
        ServerEvent::MatchFound {
            opponent_name: "Ann".into()
        }
    );
    (ann, bob)
}

/// Matches Ann and Bob and places both fleets. Ann moves first.
async fn started(server: &TestServer) -> (BroadsideClient, BroadsideClient) {
    let (ann, bob) = matched(server).await;
    for client in [&ann, &bob] {
        client
            .send(&ClientCommand::ShipPlacement { ships: fleet() })
            .await
            .unwrap();
    }
    assert_eq!(
        wait_for(&ann, |e| matches!(e, ServerEvent::GameStart { .. })).await,
        ServerEvent::GameStart { your_turn: true }
    );
    assert_eq!(
        wait_for(&bob, |e| matches!(e, ServerEvent::GameStart { .. })).await,
        ServerEvent::GameStart { your_turn: false }
    );
    (ann, bob)
}

// =========================================================================
// JOIN and matchmaking
// =========================================================================

#[tokio::test]
async fn test_join_returns_name_and_id() {
    let server = TestServer::start().await;

    let ann = server.client("  Ann ").await;
    let bob = server.client("Bob").await;

    assert_eq!(ann.name(), "Ann");
    assert_ne!(ann.player_id(), bob.player_id());
    server.shutdown().await;
}

#[tokio::test]
async fn test_join_blank_name_uses_configured_default() {
    let server = TestServer::start_with(ServerConfig {
        default_player_name: "Sailor".into(),
        ..ServerConfig::default()
    })
    .await;

    let client = server.client("   ").await;
    assert_eq!(client.name(), "Sailor");
    server.shutdown().await;
}

#[tokio::test]
async fn test_two_players_are_matched() {
    let server = TestServer::start().await;
    let _pair = matched(&server).await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_join_while_waiting_is_error() {
    let server = TestServer::start().await;
    let ann = server.client("Ann").await;

    ann.send(&ClientCommand::Join { name: None }).await.unwrap();
    assert!(matches!(next(&ann).await, ServerEvent::Error { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn test_third_player_waits_for_fourth() {
    let server = TestServer::start().await;
    let _pair = matched(&server).await;

    let cara = server.client("Cara").await;
    let dan = server.client("Dan").await;
    assert_eq!(
        next(&cara).await,
        ServerEvent::MatchFound {
            opponent_name: "Dan".into()
        }
    );
    assert_eq!(
        next(&dan).await,
        ServerEvent::MatchFound {
            opponent_name: "Cara".into()
        }
    );
    server.shutdown().await;
}

// =========================================================================
// Placement and turns
// =========================================================================

#[tokio::test]
async fn test_placement_confirmed_and_opponent_told() {
    let server = TestServer::start().await;
    let (ann, bob) = matched(&server).await;

    ann.send(&ClientCommand::ShipPlacement { ships: fleet() })
        .await
        .unwrap();

    let ServerEvent::ShipPlacementConfirmed { ships } = next(&ann).await else {
        panic!("expected SHIP_PLACEMENT_CONFIRMED");
    };
    assert_eq!(ships.len(), 10);
    assert!(matches!(next(&bob).await, ServerEvent::ShipPlaced { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_fleet_is_rejected() {
    let server = TestServer::start().await;
    let (ann, _bob) = matched(&server).await;

    let mut ships = fleet();
    ships.pop();
    ann.send(&ClientCommand::ShipPlacement { ships }).await.unwrap();

    assert!(matches!(next(&ann).await, ServerEvent::Error { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn test_random_placement_then_confirm_starts_game() {
    let server = TestServer::start().await;
    let (ann, bob) = matched(&server).await;

    for client in [&ann, &bob] {
        client.send(&ClientCommand::PlaceShipsRandomly).await.unwrap();
        let ServerEvent::ShipPlacementConfirmed { ships } =
            wait_for(client, |e| matches!(e, ServerEvent::ShipPlacementConfirmed { .. })).await
        else {
            unreachable!();
        };
        assert_eq!(ships.len(), FLEET.len());
        client.send(&ClientCommand::AllShipsPlaced).await.unwrap();
    }

    assert_eq!(
        wait_for(&ann, |e| matches!(e, ServerEvent::GameStart { .. })).await,
        ServerEvent::GameStart { your_turn: true }
    );
    assert_eq!(
        wait_for(&bob, |e| matches!(e, ServerEvent::GameStart { .. })).await,
        ServerEvent::GameStart { your_turn: false }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_miss_flips_turn_and_hit_keeps_it() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    ann.send(&attack(9, 9)).await.unwrap();
    let ServerEvent::AttackResult(report) = next(&ann).await else {
        panic!("expected ATTACK_RESULT");
    };
    assert!(!report.hit);
    assert_eq!(report.attacker_id, ann.player_id());
    assert_eq!(next(&ann).await, ServerEvent::OpponentTurn);
    assert!(matches!(next(&bob).await, ServerEvent::AttackResult(_)));
    assert_eq!(next(&bob).await, ServerEvent::YourTurn);

    bob.send(&attack(0, 0)).await.unwrap();
    let ServerEvent::AttackResult(report) = next(&bob).await else {
        panic!("expected ATTACK_RESULT");
    };
    assert!(report.hit);
    assert_eq!(next(&bob).await, ServerEvent::YourTurnAgain);
    assert!(matches!(next(&ann).await, ServerEvent::AttackResult(_)));
    assert_eq!(next(&ann).await, ServerEvent::OpponentTurn);
    server.shutdown().await;
}

#[tokio::test]
async fn test_out_of_turn_attack_is_ignored() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    bob.send(&attack(0, 0)).await.unwrap();
    // Bob's chat arrives after his attack was handled.
    bob.send(&ClientCommand::ChatMessage { text: "oops".into() })
        .await
        .unwrap();
    assert!(matches!(
        next(&ann).await,
        ServerEvent::ChatMessageReceived { .. }
    ));
    ann.send(&attack(9, 9)).await.unwrap();

    // The first thing either side sees is Ann's miss, not Bob's shot.
    let ServerEvent::AttackResult(report) = next(&bob).await else {
        panic!("expected ATTACK_RESULT");
    };
    assert_eq!(report.attacker_id, ann.player_id());
    assert_eq!(report.target, Coord::new(9, 9));
    server.shutdown().await;
}

#[tokio::test]
async fn test_whole_game_reports_winner_and_allows_rejoin() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    for ship in fleet() {
        for cell in ship.positions() {
            ann.send(&attack(cell.x, cell.y)).await.unwrap();
        }
    }

    let winner = ServerEvent::GameOver {
        winner: "Ann".into(),
    };
    assert_eq!(
        wait_for(&ann, |e| matches!(e, ServerEvent::GameOver { .. })).await,
        winner
    );
    assert_eq!(
        wait_for(&bob, |e| matches!(e, ServerEvent::GameOver { .. })).await,
        winner
    );

    ann.send(&ClientCommand::Join { name: None }).await.unwrap();
    let ServerEvent::Joined { player_id, .. } = next(&ann).await else {
        panic!("expected JOINED after the game ended");
    };
    assert_eq!(player_id, ann.player_id());
    server.shutdown().await;
}

#[tokio::test]
async fn test_sinking_reports_ship_and_blocked_cells() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    // The single at (3,4) sits in open water.
    ann.send(&attack(3, 4)).await.unwrap();
    let ServerEvent::AttackResult(report) = next(&bob).await else {
        panic!("expected ATTACK_RESULT");
    };
    assert!(report.hit && report.sunk && !report.game_over);
    assert_eq!(report.sunk_ship, vec![Coord::new(3, 4)]);
    assert!(report.blocked.contains(&Coord::new(3, 5)));
    assert!(report.blocked.contains(&Coord::new(2, 5)));
    server.shutdown().await;
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn test_chat_is_relayed_with_sender_name() {
    let server = TestServer::start().await;
    let (ann, bob) = matched(&server).await;

    ann.send(&ClientCommand::ChatMessage {
        text: "ready? a=b; c".into(),
    })
    .await
    .unwrap();

    assert_eq!(
        next(&bob).await,
        ServerEvent::ChatMessageReceived {
            sender: "Ann".into(),
            text: "ready? a=b; c".into(),
        }
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_chat_outside_game_is_error() {
    let server = TestServer::start().await;
    let ann = server.client("Ann").await;

    ann.send(&ClientCommand::ChatMessage { text: "hello?".into() })
        .await
        .unwrap();
    assert_eq!(next(&ann).await, ServerEvent::error("not in a game"));
    server.shutdown().await;
}

// =========================================================================
// Leaving and disconnects
// =========================================================================

#[tokio::test]
async fn test_disconnect_notifies_opponent_and_frees_them() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    ann.close().await.unwrap();

    assert!(matches!(
        next(&bob).await,
        ServerEvent::OpponentDisconnected { .. }
    ));

    bob.send(&ClientCommand::Join { name: None }).await.unwrap();
    assert!(matches!(next(&bob).await, ServerEvent::Joined { .. }));
    server.shutdown().await;
}

#[tokio::test]
async fn test_leave_game_then_close_notifies_once() {
    let server = TestServer::start().await;
    let (ann, bob) = matched(&server).await;

    ann.send(&ClientCommand::LeaveGame {
        player_id: Some(ann.player_id()),
    })
    .await
    .unwrap();
    ann.close().await.unwrap();

    assert!(matches!(next(&bob).await, ServerEvent::OpponentLeft { .. }));

    // A chat from Bob now gets an ERROR, proving nothing else was queued.
    bob.send(&ClientCommand::ChatMessage { text: "hello?".into() })
        .await
        .unwrap();
    assert_eq!(next(&bob).await, ServerEvent::error("not in a game"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_waiting_player_disconnect_is_never_paired() {
    let server = TestServer::start().await;
    let ghost = server.client("Ghost").await;
    ghost.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ann = server.client("Ann").await;
    let bob = server.client("Bob").await;
    assert_eq!(
        next(&ann).await,
        ServerEvent::MatchFound {
            opponent_name: "Bob".into()
        }
    );
    assert_eq!(
        next(&bob).await,
        ServerEvent::MatchFound {
            opponent_name: "Ann".into()
        }
    );
    server.shutdown().await;
}

// =========================================================================
// Malformed input
// =========================================================================

#[tokio::test]
async fn test_malformed_lines_keep_connection_open() {
    let server = TestServer::start().await;
    let conn = TcpLineConnection::connect(server.addr).await.unwrap();

    // Noise is dropped silently; a known command with bad fields is
    // answered with ERROR.
    conn.send(b"no separator here\n").await.unwrap();
    conn.send(b"LAUNCH:missiles=all\n").await.unwrap();
    conn.send(b"\n").await.unwrap();
    conn.send(b"ATTACK:x=zz;y=1\n").await.unwrap();

    let line = tokio::time::timeout(WAIT, conn.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(
        broadside::protocol::decode_event(&line).unwrap(),
        ServerEvent::Error { .. }
    ));

    conn.send(b"JOIN:name=Raw\n").await.unwrap();
    let line = tokio::time::timeout(WAIT, conn.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let ServerEvent::Joined { player_name, .. } = broadside::protocol::decode_event(&line).unwrap()
    else {
        panic!("expected JOINED");
    };
    assert_eq!(player_name, "Raw");
    server.shutdown().await;
}

#[tokio::test]
async fn test_overlong_line_closes_connection() {
    let server = TestServer::start_with(ServerConfig {
        max_line_length: 32,
        ..ServerConfig::default()
    })
    .await;
    let conn = TcpLineConnection::connect(server.addr).await.unwrap();

    let line = format!("CHAT_MESSAGE:text={}\n", "x".repeat(100));
    conn.send(line.as_bytes()).await.unwrap();

    let result = tokio::time::timeout(WAIT, conn.recv()).await.unwrap();
    assert!(!matches!(result, Ok(Some(_))), "got {result:?}");
    server.shutdown().await;
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_closes_live_connections() {
    let server = TestServer::start().await;
    let (ann, bob) = started(&server).await;

    server.shutdown().await;

    for client in [&ann, &bob] {
        let ended = tokio::time::timeout(WAIT, async {
            loop {
                match client.recv().await {
                    Ok(Some(_)) => continue,
                    _ => break,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "client still connected after shutdown");
    }
}

#[tokio::test]
async fn test_run_until_connection_accepted_at_shutdown_still_returns() {
    // A socket that connects right before the stop signal is accepted, but
    // its handler may not have registered a session yet when shutdown runs.
    for _ in 0..40 {
        let server = TestServer::start().await;
        let mut raw = tokio::net::TcpStream::connect(server.addr).await.unwrap();

        server.shutdown().await;

        let mut buf = [0u8; 64];
        let read = tokio::time::timeout(WAIT, raw.read(&mut buf))
            .await
            .expect("socket still open after shutdown");
        assert!(matches!(read, Ok(0) | Err(_)), "unexpected data: {read:?}");
    }
}
