//! Terminal client: one game, moves typed as `row col`.

use anyhow::{Context, Result};
use derive_more::{Display, Error};
use duel_server::protocol::{ClientMessage, ServerMessage, Status, decode_frame, encode_frame};
use duel_tictactoe::{Board, Player};
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

/// A line typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Place a mark.
    Move {
        /// Row 0-2.
        row: i64,
        /// Column 0-2.
        col: i64,
    },
    /// Leave the game.
    Quit,
}

/// A line that is neither a move nor `quit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("enter move as: row col (0-2)")]
pub struct InputError;

/// Parses one line of user input. Blank lines yield `None`.
///
/// Only the shape is checked here; the server judges whether the move is
/// legal.
pub fn parse_input(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "quit" {
        return Ok(Some(Input::Quit));
    }
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(row), Some(col), None) => {
            let row = row.parse().map_err(|_| InputError)?;
            let col = col.parse().map_err(|_| InputError)?;
            Ok(Some(Input::Move { row, col }))
        }
        _ => Err(InputError),
    }
}

/// What the client knows about its game.
#[derive(Debug, Default)]
pub struct View {
    me: Option<Player>,
    status: Option<Status>,
}

/// Text produced by one server message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Text for stdout.
    pub text: String,
    /// The game is over.
    pub finished: bool,
}

impl View {
    /// True once a state with status `in_progress` has been seen and no
    /// terminal state since.
    pub fn in_progress(&self) -> bool {
        self.status == Some(Status::InProgress)
    }

    /// Folds a server message into the view and renders it.
    pub fn apply(&mut self, msg: ServerMessage) -> Step {
        let mut step = Step::default();
        let out = &mut step.text;
        match msg {
            ServerMessage::Start { player } => {
                self.me = Some(player);
                let _ = writeln!(out, "You are {player} ({})", seat_name(player));
                let _ = writeln!(out, "How to play: enter moves as `row col` (0-2). Example: 1 2");
                let _ = writeln!(
                    out,
                    "Goal: get three in a row horizontally, vertically, or diagonally."
                );
            }
            ServerMessage::State {
                board,
                turn,
                status,
                winner,
                error,
            } => {
                self.status = Some(status);
                render_board(out, &board);
                match status {
                    Status::Win => {
                        let winner = winner.map(|w| w.to_string()).unwrap_or_default();
                        let _ = writeln!(out, "Winner: {winner}");
                    }
                    Status::Draw => {
                        let _ = writeln!(out, "Draw.");
                    }
                    Status::Abandoned => {
                        let _ = writeln!(out, "Game ended: {}", error.unwrap_or_default());
                    }
                    Status::InProgress => match self.me {
                        Some(me) if me == turn => {
                            let _ = write!(out, "Your move (row col): ");
                        }
                        Some(_) => {
                            let _ = writeln!(out, "Opponent's turn ({turn}). Please wait...");
                        }
                        None => {}
                    },
                }
                step.finished = status.is_terminal();
            }
            ServerMessage::Error { error } => {
                let _ = writeln!(out, "Error: {error}");
            }
            ServerMessage::Unknown => {
                debug!("Ignoring unknown server message");
            }
        }
        step
    }
}

fn seat_name(player: Player) -> &'static str {
    match player {
        Player::X => "Player 1",
        Player::O => "Player 2",
    }
}

fn render_board(out: &mut String, encoded: &str) {
    let Ok(board) = encoded.parse::<Board>() else {
        let _ = writeln!(out, "board unavailable");
        return;
    };
    let _ = writeln!(out, "Legend: X (Player 1), O (Player 2)");
    let _ = writeln!(out, "Board:");
    for row in board.rows() {
        let _ = writeln!(out, " {row}");
    }
}

/// Connects to `addr` and plays one game on stdin/stdout.
#[instrument]
pub async fn run(addr: &str) -> Result<()> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("connect to {addr}"))?;
    info!("Connected to {addr}");
    let (read, write) = stream.into_split();
    play(
        BufReader::new(read),
        write,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Relays between the server and the user until the game ends, the user
/// quits, or the server hangs up.
pub async fn play<R, W, I, O>(server: R, mut to_server: W, input: I, mut out: O) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut frames = server.lines();
    let mut input = input.lines();
    let mut input_open = true;
    let mut view = View::default();

    loop {
        tokio::select! {
            frame = frames.next_line() => {
                let Some(frame) = frame.context("read from server")? else {
                    info!("Server closed the connection");
                    break;
                };
                let msg = match decode_frame::<ServerMessage>(frame.as_bytes()) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "Invalid server message");
                        continue;
                    }
                };
                let step = view.apply(msg);
                out.write_all(step.text.as_bytes()).await?;
                out.flush().await?;
                if step.finished {
                    break;
                }
            }
            line = input.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    input_open = false;
                    continue;
                };
                match parse_input(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => {
                        send(&mut to_server, &ClientMessage::Quit).await?;
                        break;
                    }
                    Ok(Some(Input::Move { row, col })) if view.in_progress() => {
                        send(&mut to_server, &ClientMessage::Move { row, col }).await?;
                    }
                    Ok(Some(Input::Move { .. })) => {
                        out.write_all(b"game is not in progress\n").await?;
                        out.flush().await?;
                    }
                    Err(e) => {
                        out.write_all(format!("{e}\n").as_bytes()).await?;
                        out.flush().await?;
                    }
                }
            }
        }
    }
    Ok(())
}

async fn send<W>(to_server: &mut W, msg: &ClientMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(msg)?;
    to_server
        .write_all(&frame)
        .await
        .context("write to server")?;
    to_server.flush().await?;
    Ok(())
}
