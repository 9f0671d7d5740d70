//! Networked tic-tac-toe: matchmaking and per-session event loops.
//!
//! # Architecture
//!
//! - **Connection**: an actor per accepted stream, with an outbound task
//!   behind a bounded queue and an inbound task that parses frames
//! - **Matchmaker**: a FIFO queue that pairs connections in arrival order
//! - **Session**: one task per pair, the only writer of its game state
//! - **Server**: the TCP accept loop with graceful shutdown
//!
//! # Example
//!
//! ```no_run
//! use duel_server::{Server, ServerConfig};
//!
//! # async fn example() -> Result<(), duel_server::ServerError> {
//! let config = ServerConfig::default().with_listen_addr("127.0.0.1:9000");
//! let server = Server::bind(config).await?;
//! server.serve_with_shutdown(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod connection;
mod error;
mod matchmaker;
pub mod protocol;
mod server;
mod session;

pub use config::{ServerConfig, normalize_addr};
pub use connection::{Connection, ConnectionId, InboundEvent, Outbox};
pub use error::{ConfigError, ServerError, ServerErrorKind};
pub use matchmaker::{MatchQueue, Matchmaker, MatchmakerClosed, MatchmakerHandle};
pub use protocol::{ClientMessage, ServerMessage, Status};
pub use server::Server;
pub use session::{Outcome, Session, SessionId, SessionPhase, SessionReport};
