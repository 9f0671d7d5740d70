//! Session coordinator: one game, two connections, one event loop.
//!
//! The loop in [`Session::run`] is the only code that touches the
//! session's [`Game`]. Both connections' inbound tasks feed a single
//! channel, so moves are applied in the order the loop receives them and
//! a near-simultaneous move from the other player is rejected by the
//! ordinary turn check.

use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionId, InboundEvent, Outbox};
use crate::protocol::{OPPONENT_DISCONNECTED, ServerMessage};
use derive_more::Display;
use derive_new::new;
use duel_tictactoe::{Game, GameStatus, Move, Player};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Identifies a session in logs.
pub type SessionId = u64;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Outcome {
    /// A player completed a line.
    #[display("{_0} wins")]
    Won(Player),
    /// The board filled with no line.
    #[display("draw")]
    Draw,
    /// A player left before the rules decided the game.
    #[display("abandoned")]
    Abandoned {
        /// The player who left, when known.
        quitter: Option<Player>,
    },
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Marks not yet announced.
    Setup,
    /// Accepting moves.
    InProgress,
    /// Finished; no further events are processed.
    Terminal(Outcome),
}

/// Summary returned when a session's loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Session identifier.
    pub id: SessionId,
    /// How the game ended.
    pub outcome: Outcome,
    /// Final board encoding.
    pub board: String,
    /// Moves applied.
    pub moves: u8,
}

/// One seat at the table.
#[derive(Debug, new)]
struct Participant {
    player: Player,
    outbox: Outbox,
}

/// A paired game between two connections.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    game: Game,
    phase: SessionPhase,
    x: Participant,
    o: Participant,
    events: mpsc::Receiver<InboundEvent>,
    grace: Duration,
}

impl Session {
    /// Pairs two connections: `first` plays X, `second` plays O.
    ///
    /// Both inbound tasks start here; their events queue until
    /// [`Session::run`] picks them up.
    #[instrument(skip_all, fields(session_id = id, x = first.id(), o = second.id()))]
    pub fn new(
        id: SessionId,
        first: Connection,
        second: Connection,
        config: &ServerConfig,
    ) -> Self {
        let (tx, events) = mpsc::channel(*config.event_capacity());
        let x = Participant::new(Player::X, first.start_reader(tx.clone()));
        let o = Participant::new(Player::O, second.start_reader(tx));
        Self {
            id,
            game: Game::new(),
            phase: SessionPhase::Setup,
            x,
            o,
            events,
            grace: config.abandon_grace(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Runs the session to completion.
    #[instrument(skip_all, fields(session_id = self.id))]
    pub async fn run(mut self) -> SessionReport {
        self.setup();

        let outcome = loop {
            if let SessionPhase::Terminal(outcome) = self.phase {
                break outcome;
            }
            let Some(event) = self.events.recv().await else {
                // Every inbound task reports before it exits, so this only
                // happens if both were lost without a word.
                warn!("Event channel closed unexpectedly");
                self.game.abandon();
                self.close_all();
                break Outcome::Abandoned { quitter: None };
            };
            match event {
                InboundEvent::Move { from, row, col } => self.on_move(from, row, col),
                InboundEvent::Disconnected { from } => self.on_disconnect(from).await,
            }
        };

        info!(%outcome, board = %self.game.board(), "Session finished");
        SessionReport {
            id: self.id,
            outcome,
            board: self.game.board().to_string(),
            moves: self.game.state().move_count(),
        }
    }

    /// Announces marks and the empty board.
    fn setup(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Setup);
        for seat in [&self.x, &self.o] {
            seat.outbox.send(ServerMessage::Start { player: seat.player });
        }
        self.broadcast(ServerMessage::state(&self.game));
        self.phase = SessionPhase::InProgress;
        info!(x = self.x.outbox.id(), o = self.o.outbox.id(), "Session started");
    }

    /// Mark played by a connection, if it belongs to this session.
    fn player_of(&self, id: ConnectionId) -> Option<Player> {
        [&self.x, &self.o]
            .into_iter()
            .find(|p| p.outbox.id() == id)
            .map(|p| p.player)
    }

    fn seat(&self, player: Player) -> &Participant {
        match player {
            Player::X => &self.x,
            Player::O => &self.o,
        }
    }

    fn on_move(&mut self, from: ConnectionId, row: i64, col: i64) {
        if matches!(self.phase, SessionPhase::Terminal(_)) {
            debug!(connection_id = from, "Ignoring move after session end");
            return;
        }
        let Some(player) = self.player_of(from) else {
            warn!(connection_id = from, "Ignoring move from non-participant");
            return;
        };

        match self.game.apply_move(Move::new(player, row, col)) {
            Err(e) => {
                debug!(%player, row, col, error = %e, "Move rejected");
                self.seat(player).outbox.send(ServerMessage::error(e.to_string()));
            }
            Ok(status) => {
                self.broadcast(ServerMessage::state(&self.game));
                let outcome = match status {
                    GameStatus::InProgress => return,
                    GameStatus::Won(winner) => Outcome::Won(winner),
                    GameStatus::Draw => Outcome::Draw,
                    GameStatus::Abandoned => Outcome::Abandoned { quitter: None },
                };
                self.close_all();
                self.phase = SessionPhase::Terminal(outcome);
            }
        }
    }

    async fn on_disconnect(&mut self, from: ConnectionId) {
        if matches!(self.phase, SessionPhase::Terminal(_)) {
            return;
        }
        let Some(quitter) = self.player_of(from) else {
            warn!(connection_id = from, "Ignoring disconnect from non-participant");
            return;
        };
        info!(%quitter, "Participant disconnected, abandoning session");

        self.game.abandon();
        self.seat(quitter.opponent())
            .outbox
            .send(ServerMessage::abandoned(&self.game, OPPONENT_DISCONNECTED));
        tokio::time::sleep(self.grace).await;
        self.close_all();
        self.phase = SessionPhase::Terminal(Outcome::Abandoned {
            quitter: Some(quitter),
        });
    }

    fn broadcast(&self, msg: ServerMessage) {
        self.x.outbox.send(msg.clone());
        self.o.outbox.send(msg);
    }

    fn close_all(&self) {
        self.x.outbox.close();
        self.o.outbox.close();
    }
}
