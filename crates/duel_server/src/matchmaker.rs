//! FIFO matchmaking.
//!
//! Accepted connections are handed to the [`Matchmaker`] through a
//! [`MatchmakerHandle`]. The matchmaker owns the waiting queue outright and
//! pairs strictly in arrival order: the older of each pair plays X.

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::session::{Session, SessionId, SessionReport};
use derive_more::{Display, Error};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Capacity of the hand-off channel between the accept loop and the
/// matchmaker.
const INCOMING_CAPACITY: usize = 64;

/// Arrival-ordered waiting list.
#[derive(Debug)]
pub struct MatchQueue<T> {
    waiting: VecDeque<T>,
}

impl<T> MatchQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
        }
    }

    /// Adds an arrival at the back.
    pub fn push(&mut self, item: T) {
        self.waiting.push_back(item);
    }

    /// Removes the two oldest arrivals, if there are two.
    pub fn pop_pair(&mut self) -> Option<(T, T)> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some((first, second))
    }

    /// Number of arrivals still waiting.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// True when nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Empties the queue, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.waiting.drain(..)
    }
}

impl<T> Default for MatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned when the matchmaker has already shut down.
#[derive(Debug, Display, Error)]
#[display("matchmaker is no longer accepting connections")]
pub struct MatchmakerClosed {
    /// The connection that could not be queued.
    pub connection: Connection,
}

/// Cloneable handle for queueing connections.
#[derive(Debug, Clone)]
pub struct MatchmakerHandle {
    tx: mpsc::Sender<Connection>,
}

impl MatchmakerHandle {
    /// Queues a connection for pairing.
    pub async fn enqueue(&self, connection: Connection) -> Result<(), MatchmakerClosed> {
        self.tx
            .send(connection)
            .await
            .map_err(|e| MatchmakerClosed { connection: e.0 })
    }
}

/// Receives connections and starts a [`Session`] for every pair.
#[derive(Debug)]
pub struct Matchmaker {
    incoming: mpsc::Receiver<Connection>,
    queue: MatchQueue<Connection>,
    config: Arc<ServerConfig>,
    next_session: SessionId,
    sessions: Option<mpsc::UnboundedSender<JoinHandle<SessionReport>>>,
}

impl Matchmaker {
    /// Creates a matchmaker and the handle that feeds it.
    pub fn new(config: Arc<ServerConfig>) -> (Self, MatchmakerHandle) {
        let (tx, incoming) = mpsc::channel(INCOMING_CAPACITY);
        let matchmaker = Self {
            incoming,
            queue: MatchQueue::new(),
            config,
            next_session: 1,
            sessions: None,
        };
        (matchmaker, MatchmakerHandle { tx })
    }

    /// Reports the join handle of every session started from now on.
    pub fn watch_sessions(&mut self) -> mpsc::UnboundedReceiver<JoinHandle<SessionReport>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions = Some(tx);
        rx
    }

    /// Spawns the matchmaker on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Pairs connections until every handle is dropped, then closes
    /// whoever is still waiting.
    #[instrument(skip_all)]
    pub async fn run(mut self) {
        info!("Matchmaker started");
        while let Some(connection) = self.incoming.recv().await {
            debug!(
                connection_id = connection.id(),
                peer = connection.peer(),
                waiting = self.queue.len() + 1,
                "Connection queued"
            );
            self.queue.push(connection);
            while let Some((first, second)) = self.queue.pop_pair() {
                self.start_session(first, second);
            }
        }

        for connection in self.queue.drain() {
            debug!(connection_id = connection.id(), "Closing unpaired connection");
            connection.close();
        }
        info!("Matchmaker stopped");
    }

    fn start_session(&mut self, first: Connection, second: Connection) {
        let id = self.next_session;
        self.next_session += 1;
        info!(
            session_id = id,
            x = first.id(),
            o = second.id(),
            "Paired connections"
        );

        let session = Session::new(id, first, second, &self.config);
        let handle = tokio::spawn(session.run());
        if let Some(sessions) = &self.sessions
            && sessions.send(handle).is_err()
        {
            self.sessions = None;
        }
    }
}
