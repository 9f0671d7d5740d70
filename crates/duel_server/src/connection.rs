//! Connection actor: one duplex byte stream, two tasks.
//!
//! The outbound task is spawned as soon as the stream is accepted and
//! drains a bounded queue of [`ServerMessage`]s, writing one frame at a
//! time under a deadline. The inbound task is spawned when the connection
//! joins a session; it parses frames, answers protocol errors locally and
//! forwards moves to the session as [`InboundEvent`]s.
//!
//! Enqueueing never waits. A full queue means the peer is not keeping up,
//! and the connection is closed instead of stalling the session.
//!
//! Closing is a one-way latch shared by both tasks. Once set, nothing new
//! is enqueued, the outbound task flushes what is already queued and shuts
//! the stream down, and the inbound task stops reading.

use crate::config::ServerConfig;
use crate::protocol::{
    ClientMessage, INVALID_MESSAGE, ServerMessage, UNKNOWN_MESSAGE_TYPE, decode_frame,
    encode_frame,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// Identifies a connection in logs and session events.
pub type ConnectionId = u64;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// What a connection's inbound task reports to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEvent {
    /// The peer asked to place a mark.
    Move {
        /// Sending connection.
        from: ConnectionId,
        /// Requested row.
        row: i64,
        /// Requested column.
        col: i64,
    },
    /// The inbound path ended: quit, end of stream, I/O error, or close.
    Disconnected {
        /// Connection that went away.
        from: ConnectionId,
    },
}

/// Sending side of a connection: the bounded outbound queue plus the
/// shared close latch.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
    closed: Arc<watch::Sender<bool>>,
}

impl Outbox {
    /// Connection this outbox belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message without waiting.
    ///
    /// Returns `false` if the message was dropped. A full queue closes the
    /// connection.
    pub fn send(&self, msg: ServerMessage) -> bool {
        if self.is_closed() {
            debug!(
                connection_id = self.id,
                kind = msg.kind(),
                "Dropping message for closed connection"
            );
            return false;
        }
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(
                    connection_id = self.id,
                    kind = msg.kind(),
                    "Outbound queue full, closing slow connection"
                );
                self.close();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                false
            }
        }
    }

    /// Closes the connection. Only the first call has any effect.
    pub fn close(&self) {
        if latch(&self.closed) {
            debug!(connection_id = self.id, "Connection closing");
        }
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        wait_closed(&mut self.closed.subscribe()).await;
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

/// Waits for the close latch. The `wait_for` guard must not outlive this
/// call or the awaiting task stops being `Send`.
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closed| *closed).await;
}

/// Sets the close latch. Returns `true` only for the call that set it.
fn latch(closed: &watch::Sender<bool>) -> bool {
    closed.send_if_modified(|closed| {
        if *closed {
            false
        } else {
            *closed = true;
            true
        }
    })
}

/// An accepted connection whose outbound task is already running.
///
/// The inbound half is held here until the connection joins a session.
pub struct Connection {
    id: ConnectionId,
    peer: String,
    outbox: Outbox,
    reader: BoxedReader,
    max_frame_bytes: usize,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.outbox.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wraps a stream and starts its outbound task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn<S>(
        id: ConnectionId,
        stream: S,
        peer: impl Into<String>,
        config: &ServerConfig,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = peer.into();
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(*config.outbound_capacity());
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        let span = info_span!("outbound", connection_id = id, peer = %peer);
        tokio::spawn(
            write_loop(
                BufWriter::new(write_half),
                rx,
                Arc::clone(&closed),
                config.write_timeout(),
            )
            .instrument(span),
        );

        Self {
            id,
            peer,
            outbox: Outbox { id, tx, closed },
            reader: Box::new(read_half),
            max_frame_bytes: *config.max_frame_bytes(),
        }
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address or test label.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Handle for queueing outbound messages.
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Closes a connection that will never join a session.
    pub fn close(self) {
        self.outbox.close();
    }

    /// Starts the inbound task, which reports to `events`, and returns the
    /// outbox for the session to keep.
    pub fn start_reader(self, events: mpsc::Sender<InboundEvent>) -> Outbox {
        let span = info_span!("inbound", connection_id = self.id, peer = %self.peer);
        let outbox = self.outbox.clone();
        tokio::spawn(
            read_loop(self.reader, self.outbox, events, self.max_frame_bytes).instrument(span),
        );
        outbox
    }
}

/// Drains the outbound queue until the connection closes, then flushes
/// whatever was queued before the close and shuts the stream down.
async fn write_loop<W>(
    mut writer: BufWriter<W>,
    mut rx: mpsc::Receiver<ServerMessage>,
    closed: Arc<watch::Sender<bool>>,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let mut close_rx = closed.subscribe();
    let mut healthy = true;

    loop {
        let msg = tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = wait_closed(&mut close_rx) => break,
        };
        if let Err(e) = write_frame(&mut writer, &msg, write_timeout).await {
            warn!(error = %e, kind = msg.kind(), "Write failed, closing connection");
            healthy = false;
            break;
        }
    }

    latch(&closed);
    rx.close();
    if healthy {
        while let Ok(msg) = rx.try_recv() {
            if let Err(e) = write_frame(&mut writer, &msg, write_timeout).await {
                warn!(error = %e, "Write failed while flushing");
                break;
            }
        }
    }
    let _ = tokio::time::timeout(write_timeout, writer.shutdown()).await;
    debug!("Outbound task finished");
}

async fn write_frame<W>(
    writer: &mut BufWriter<W>,
    msg: &ServerMessage,
    deadline: Duration,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(msg).map_err(io::Error::other)?;
    tokio::time::timeout(deadline, async {
        writer.write_all(&frame).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write deadline exceeded"))?
}

/// Reads frames until quit, end of stream, an I/O error or close, then
/// reports the disconnect.
async fn read_loop(
    reader: BoxedReader,
    outbox: Outbox,
    events: mpsc::Sender<InboundEvent>,
    max_frame_bytes: usize,
) {
    let id = outbox.id();
    let mut reader = BufReader::new(reader);
    let mut close_rx = outbox.subscribe();
    let mut frame = Vec::new();

    loop {
        let read = tokio::select! {
            read = read_frame(&mut reader, &mut frame, max_frame_bytes) => read,
            _ = wait_closed(&mut close_rx) => {
                debug!("Connection closed, inbound task stopping");
                break;
            }
        };
        match read {
            Ok(true) => {}
            Ok(false) => {
                info!("Peer closed the stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read failed");
                break;
            }
        }

        match decode_frame::<ClientMessage>(&frame) {
            Ok(ClientMessage::Move { row, col }) => {
                debug!(row, col, "Move received");
                if events.send(InboundEvent::Move { from: id, row, col }).await.is_err() {
                    break;
                }
            }
            Ok(ClientMessage::Quit) => {
                info!("Peer quit");
                break;
            }
            Ok(ClientMessage::Unknown) => {
                warn!("Unexpected message type");
                outbox.send(ServerMessage::error(UNKNOWN_MESSAGE_TYPE));
            }
            Err(e) => {
                warn!(error = %e, "Undecodable frame");
                outbox.send(ServerMessage::error(INVALID_MESSAGE));
            }
        }
    }

    let _ = events.send(InboundEvent::Disconnected { from: id }).await;
}

/// Reads one newline-terminated frame into `buf`, newline stripped.
///
/// Returns `Ok(false)` at end of stream. A final line without a newline
/// still counts as a frame. Lines longer than `max` bytes are an error.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > max {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame exceeds {max} bytes"),
        ));
    }
    Ok(true)
}
