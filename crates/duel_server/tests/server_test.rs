//! Listener over real sockets.

mod common;

use common::{Peer, STEP, quick_config};
use duel_server::{Server, ServerConfig, ServerErrorKind, ServerMessage};
use duel_tictactoe::Player;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

#[tokio::test]
async fn test_two_clients_play_over_tcp() {
    let server = Server::bind(quick_config()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stopped.await;
    }));

    let mut a = Peer::new(TcpStream::connect(addr).await.unwrap());
    let mut b = Peer::new(TcpStream::connect(addr).await.unwrap());

    let ServerMessage::Start { player } = a.recv().await else {
        panic!("expected start");
    };
    assert!(matches!(b.recv().await, ServerMessage::Start { player: p } if p == player.opponent()));
    let (mut x, mut o) = if player == Player::X { (a, b) } else { (b, a) };
    x.recv().await;
    o.recv().await;

    for (row, col, x_moves) in [(0, 0, true), (1, 0, false), (1, 1, true), (2, 0, false)] {
        if x_moves {
            x.send_move(row, col).await;
        } else {
            o.send_move(row, col).await;
        }
        assert_eq!(x.recv_json().await["status"], "in_progress");
        assert_eq!(o.recv_json().await["status"], "in_progress");
    }
    x.send_move(2, 2).await;
    let last = o.recv_json().await;
    assert_eq!(last["board"], "X..OX.O.X");
    assert_eq!(last["winner"], "X");
    assert_eq!(x.recv_json().await, last);
    x.expect_eof().await;
    o.expect_eof().await;

    stop.send(()).unwrap();
    tokio::time::timeout(STEP, serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_unpaired_client_closed_on_shutdown() {
    let server = Server::bind(quick_config()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stopped.await;
    }));

    let mut lonely = Peer::new(TcpStream::connect(addr).await.unwrap());
    // Give the accept loop a chance to queue the connection.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    stop.send(()).unwrap();
    tokio::time::timeout(STEP, serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    lonely.expect_closed().await;
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let first = Server::bind(quick_config()).await.unwrap();
    let taken = first.local_addr().unwrap().to_string();

    let err = Server::bind(ServerConfig::default().with_listen_addr(taken.clone()))
        .await
        .unwrap_err();
    match err.kind {
        ServerErrorKind::Bind { addr, .. } => assert_eq!(addr, taken),
        other => panic!("expected bind error, got {other}"),
    }
}

#[tokio::test]
async fn test_invalid_config_rejected_before_binding() {
    let config = quick_config().with_event_capacity(0);
    let err = Server::bind(config).await.unwrap_err();
    assert!(matches!(err.kind, ServerErrorKind::Bind { .. }));
    assert!(err.to_string().contains("event_capacity"));
}
