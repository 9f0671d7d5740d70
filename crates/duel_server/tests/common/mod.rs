//! Shared helpers: scripted peers talking to the server over in-memory pipes.

#![allow(dead_code)]

use duel_server::{Connection, ConnectionId, ServerConfig, ServerMessage, Session, SessionReport};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines,
    ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

/// Upper bound on any single wait in a test.
pub const STEP: Duration = Duration::from_secs(3);

/// Pipe buffer large enough that a well-behaved peer never stalls.
pub const PIPE: usize = 16 * 1024;

/// Test side of a connection.
pub struct Peer<S> {
    lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
}

impl<S> Peer<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Next raw line, or `None` at end of stream.
    pub async fn recv_line(&mut self) -> Option<String> {
        tokio::time::timeout(STEP, self.lines.next_line())
            .await
            .expect("timed out waiting for a frame")
            .expect("read failed")
    }

    /// Next frame as JSON.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let line = self.recv_line().await.expect("stream ended early");
        serde_json::from_str(&line).expect("server sent invalid JSON")
    }

    /// Next frame as a typed message.
    pub async fn recv(&mut self) -> ServerMessage {
        let line = self.recv_line().await.expect("stream ended early");
        serde_json::from_str(&line).expect("server sent an unexpected frame")
    }

    /// Asserts the server closed the stream with nothing left unread.
    pub async fn expect_eof(&mut self) {
        if let Some(line) = self.recv_line().await {
            panic!("expected end of stream, got {line}");
        }
    }

    /// Like [`Peer::expect_eof`], but a reset also counts as closed.
    pub async fn expect_closed(&mut self) {
        match tokio::time::timeout(STEP, self.lines.next_line()).await {
            Ok(Ok(None)) | Ok(Err(_)) => {}
            Ok(Ok(Some(line))) => panic!("expected the stream to close, got {line}"),
            Err(_) => panic!("timed out waiting for the stream to close"),
        }
    }

    /// Asserts the next frame is the abandon notice and nothing follows it.
    pub async fn expect_eof_after_abandon(&mut self) {
        let notice = self.recv_json().await;
        assert_eq!(notice["status"], "abandoned", "got {notice}");
        assert_eq!(notice["error"], "opponent disconnected");
        self.expect_eof().await;
    }

    pub async fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn send_move(&mut self, row: i64, col: i64) {
        self.send_line(&format!(r#"{{"type":"move","row":{row},"col":{col}}}"#))
            .await;
    }

    pub async fn quit(&mut self) {
        self.send_line(r#"{"type":"quit"}"#).await;
    }

    /// Drops the peer, closing both directions.
    pub fn hang_up(self) {}
}

/// Server-side connection plus the test's end of the pipe.
pub fn connect(
    id: ConnectionId,
    config: &ServerConfig,
    pipe: usize,
) -> (Connection, Peer<DuplexStream>) {
    let (client, server) = tokio::io::duplex(pipe);
    let connection = Connection::spawn(id, server, format!("peer-{id}"), config);
    (connection, Peer::new(client))
}

/// A running session. The first peer plays X.
pub struct Table {
    pub x: Peer<DuplexStream>,
    pub o: Peer<DuplexStream>,
    pub session: JoinHandle<SessionReport>,
}

impl Table {
    pub fn open(config: &ServerConfig) -> Self {
        let (first, x) = connect(1, config, PIPE);
        let (second, o) = connect(2, config, PIPE);
        let session = tokio::spawn(Session::new(1, first, second, config).run());
        Self { x, o, session }
    }

    /// Opens a table and consumes the start and initial state frames.
    pub async fn started(config: &ServerConfig) -> Self {
        let mut table = Self::open(config);
        for peer in [&mut table.x, &mut table.o] {
            assert!(matches!(peer.recv().await, ServerMessage::Start { .. }));
            assert!(matches!(peer.recv().await, ServerMessage::State { .. }));
        }
        table
    }

    /// Sends a move from `mover` and returns the state both peers saw,
    /// after checking they saw the same one.
    pub async fn play(&mut self, x_moves: bool, row: i64, col: i64) -> serde_json::Value {
        if x_moves {
            self.x.send_move(row, col).await;
        } else {
            self.o.send_move(row, col).await;
        }
        let seen_by_x = self.x.recv_json().await;
        let seen_by_o = self.o.recv_json().await;
        assert_eq!(seen_by_x, seen_by_o);
        seen_by_x
    }

    pub async fn finish(self) -> SessionReport {
        tokio::time::timeout(STEP, self.session)
            .await
            .expect("session did not finish")
            .expect("session task panicked")
    }
}

/// Config with a short grace so abandon tests run quickly.
pub fn quick_config() -> ServerConfig {
    ServerConfig::default()
        .with_listen_addr("127.0.0.1:0")
        .with_abandon_grace_ms(20)
}
