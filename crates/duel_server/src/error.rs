//! Server and configuration error types.

use derive_more::{Display, Error};

/// What went wrong at the server level.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ServerErrorKind {
    /// The listener could not acquire its address.
    #[display("cannot listen on {addr}: {reason}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error text.
        reason: String,
    },
    /// Accepting a connection failed.
    #[display("accept failed: {_0}")]
    Accept(String),
    /// Any other socket error.
    #[display("I/O error: {_0}")]
    Io(String),
}

/// Server error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Server error: {} at {}:{}", kind, file, line)]
pub struct ServerError {
    /// Error kind.
    pub kind: ServerErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ServerError {
    /// Creates a new server error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ServerErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for ServerError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(ServerErrorKind::Io(err.to_string()))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
