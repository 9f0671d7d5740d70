//! Wire messages: one JSON object per newline-terminated frame.
//!
//! Every frame carries a `type` tag. Server-to-client and client-to-server
//! traffic use separate enums so each side only accepts what it can act on;
//! a well-formed frame with a tag the receiver does not handle decodes to
//! the `Unknown` variant instead of failing.

use duel_tictactoe::{Game, GameStatus, Player};
use serde::{Deserialize, Serialize};

/// Reply text for frames that are not valid JSON messages.
pub const INVALID_MESSAGE: &str = "invalid message";

/// Reply text for valid frames with a tag the server does not accept.
pub const UNKNOWN_MESSAGE_TYPE: &str = "unknown message type";

/// Explanation sent to the survivor of an abandoned session.
pub const OPPONENT_DISCONNECTED: &str = "opponent disconnected";

/// Game status as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    /// Moves are still accepted.
    InProgress,
    /// Someone completed a line.
    Win,
    /// Board full, no line.
    Draw,
    /// A participant left.
    Abandoned,
}

impl Status {
    /// True for every status except `InProgress`.
    pub fn is_terminal(self) -> bool {
        self != Status::InProgress
    }
}

impl From<GameStatus> for Status {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::InProgress => Status::InProgress,
            GameStatus::Won(_) => Status::Win,
            GameStatus::Draw => Status::Draw,
            GameStatus::Abandoned => Status::Abandoned,
        }
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session began; names the recipient's mark.
    Start {
        /// Mark assigned to the recipient.
        player: Player,
    },
    /// Authoritative game snapshot.
    State {
        /// Row-major board over `.`, `X`, `O`.
        board: String,
        /// Player to move next.
        turn: Player,
        /// Game status.
        status: Status,
        /// Present only when `status` is `win`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<Player>,
        /// Present only on an abandoned session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A request from this client was rejected.
    Error {
        /// Human-readable reason.
        error: String,
    },
    /// Any tag this side does not understand.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Snapshot of the game after a move.
    pub fn state(game: &Game) -> Self {
        let state = game.state();
        ServerMessage::State {
            board: state.board().to_string(),
            turn: state.next(),
            status: state.status().into(),
            winner: state.winner(),
            error: None,
        }
    }

    /// Snapshot sent to the remaining player when the session is abandoned.
    pub fn abandoned(game: &Game, reason: impl Into<String>) -> Self {
        let state = game.state();
        ServerMessage::State {
            board: state.board().to_string(),
            turn: state.next(),
            status: Status::Abandoned,
            winner: None,
            error: Some(reason.into()),
        }
    }

    /// Error reply.
    pub fn error(text: impl Into<String>) -> Self {
        ServerMessage::Error { error: text.into() }
    }

    /// Short name of the tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Start { .. } => "start",
            ServerMessage::State { .. } => "state",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Unknown => "unknown",
        }
    }
}

/// Messages sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Place a mark. Missing coordinates read as zero.
    Move {
        /// Row 0-2.
        #[serde(default)]
        row: i64,
        /// Column 0-2.
        #[serde(default)]
        col: i64,
    },
    /// Leave the session.
    Quit,
    /// Any tag this side does not understand.
    #[serde(other)]
    Unknown,
}

/// Serializes a message as one frame, newline included.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut frame = serde_json::to_vec(msg)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Parses one frame. Trailing whitespace, including the newline, is ignored.
pub fn decode_frame<'a, T: Deserialize<'a>>(frame: &'a [u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_tictactoe::Move;
    use serde_json::json;

    fn to_json(msg: &ServerMessage) -> serde_json::Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn test_start_shape() {
        assert_eq!(
            to_json(&ServerMessage::Start { player: Player::O }),
            json!({"type": "start", "player": "O"})
        );
    }

    #[test]
    fn test_initial_state_omits_winner_and_error() {
        assert_eq!(
            to_json(&ServerMessage::state(&Game::new())),
            json!({"type": "state", "board": ".........", "turn": "X", "status": "in_progress"})
        );
    }

    #[test]
    fn test_won_state_names_winner() {
        let mut game = Game::new();
        for (player, row, col) in [
            (Player::X, 0, 0),
            (Player::O, 1, 1),
            (Player::X, 0, 1),
            (Player::O, 2, 2),
            (Player::X, 0, 2),
        ] {
            game.apply_move(Move::new(player, row, col)).unwrap();
        }
        assert_eq!(
            to_json(&ServerMessage::state(&game)),
            json!({"type": "state", "board": "XXX.O...O", "turn": "X", "status": "win", "winner": "X"})
        );
    }

    #[test]
    fn test_abandoned_state_carries_error() {
        let msg = ServerMessage::abandoned(&Game::new(), OPPONENT_DISCONNECTED);
        assert_eq!(
            to_json(&msg),
            json!({
                "type": "state",
                "board": ".........",
                "turn": "X",
                "status": "abandoned",
                "error": "opponent disconnected"
            })
        );
    }

    #[test]
    fn test_frame_is_newline_terminated() {
        let frame = encode_frame(&ServerMessage::error("not your turn")).unwrap();
        assert_eq!(frame.last(), Some(&b'\n'));
        assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn test_decode_move() {
        let msg: ClientMessage = decode_frame(br#"{"type":"move","row":2,"col":1}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { row: 2, col: 1 });
    }

    #[test]
    fn test_decode_move_with_omitted_zero() {
        let msg: ClientMessage = decode_frame(b"{\"type\":\"move\",\"col\":2}\n").unwrap();
        assert_eq!(msg, ClientMessage::Move { row: 0, col: 2 });
    }

    #[test]
    fn test_decode_quit() {
        let msg: ClientMessage = decode_frame(br#"{"type":"quit"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Quit);
    }

    #[test]
    fn test_decode_other_tags_as_unknown() {
        for frame in [
            br#"{"type":"state"}"#.as_slice(),
            br#"{"type":"start","player":"X"}"#.as_slice(),
            br#"{"type":"dance"}"#.as_slice(),
        ] {
            let msg: ClientMessage = decode_frame(frame).unwrap();
            assert_eq!(msg, ClientMessage::Unknown);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_frame::<ClientMessage>(b"not json").is_err());
        assert!(decode_frame::<ClientMessage>(b"").is_err());
        assert!(decode_frame::<ClientMessage>(br#"{"row":1}"#).is_err());
        assert!(decode_frame::<ClientMessage>(br#"{"type":"move","row":"a"}"#).is_err());
    }

    #[test]
    fn test_client_reads_server_frames() {
        let frame = encode_frame(&ServerMessage::state(&Game::new())).unwrap();
        let msg: ServerMessage = decode_frame(&frame).unwrap();
        assert_eq!(msg, ServerMessage::state(&Game::new()));
    }
}
