//! Core domain types for tic-tac-toe.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Player in the game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Player {
    /// Player X (goes first).
    X,
    /// Player O (goes second).
    O,
}

impl Player {
    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Board symbol for this player's mark.
    pub fn symbol(self) -> char {
        match self {
            Player::X => 'X',
            Player::O => 'O',
        }
    }
}

/// A square on the tic-tac-toe board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square occupied by a player.
    Occupied(Player),
}

impl Square {
    /// Board symbol: `.` for empty, otherwise the player's mark.
    pub fn symbol(self) -> char {
        match self {
            Square::Empty => '.',
            Square::Occupied(player) => player.symbol(),
        }
    }

    /// Parses a board symbol.
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Square::Empty),
            'X' => Some(Square::Occupied(Player::X)),
            'O' => Some(Square::Occupied(Player::O)),
            _ => None,
        }
    }
}

/// 3x3 tic-tac-toe board.
///
/// Displays as the 9-character row-major encoding sent to clients,
/// e.g. `"XXX.O...O"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
}

impl Board {
    /// Number of rows and columns.
    pub const SIZE: usize = 3;

    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; 9],
        }
    }

    /// Gets the square at the given index (0-8).
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// Gets the square at the given row and column.
    pub fn at(&self, row: usize, col: usize) -> Option<Square> {
        if row >= Self::SIZE || col >= Self::SIZE {
            return None;
        }
        self.get(row * Self::SIZE + col)
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: usize) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Returns all squares as a slice.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Number of occupied squares.
    pub fn filled(&self) -> usize {
        self.squares.iter().filter(|s| **s != Square::Empty).count()
    }

    /// Places a mark. Callers must have checked the square is empty.
    pub(crate) fn place(&mut self, pos: usize, player: Player) {
        debug_assert!(self.is_empty(pos));
        self.squares[pos] = Square::Occupied(player);
    }

    /// Renders the board as three text rows, one per line.
    pub fn rows(&self) -> [String; 3] {
        let encoded = self.to_string();
        [
            encoded[0..3].to_string(),
            encoded[3..6].to_string(),
            encoded[6..9].to_string(),
        ]
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for square in &self.squares {
            write!(f, "{}", square.symbol())?;
        }
        Ok(())
    }
}

/// Error parsing a board encoding.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Invalid board encoding: {reason}")]
pub struct BoardParseError {
    /// What was wrong with the input.
    pub reason: String,
}

impl FromStr for Board {
    type Err = BoardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 9 {
            return Err(BoardParseError {
                reason: format!("expected 9 squares, got {}", chars.len()),
            });
        }
        let mut squares = [Square::Empty; 9];
        for (slot, c) in squares.iter_mut().zip(chars) {
            *slot = Square::from_symbol(c).ok_or_else(|| BoardParseError {
                reason: format!("unexpected symbol {c:?}"),
            })?;
        }
        Ok(Self { squares })
    }
}

/// Current status of the game.
///
/// `InProgress` is the only non-terminal status; once a game leaves it,
/// it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Game is ongoing.
    InProgress,
    /// Game ended with three in a row.
    Won(Player),
    /// Board filled with no winner.
    Draw,
    /// A participant left before the rules decided the game.
    Abandoned,
}

impl GameStatus {
    /// True for every status except `InProgress`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    /// The winner, if the game was won.
    pub fn winner(&self) -> Option<Player> {
        match self {
            GameStatus::Won(player) => Some(*player),
            _ => None,
        }
    }
}

/// Complete game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// The board.
    board: Board,
    /// Number of marks placed.
    move_count: u8,
    /// Player to move next.
    next: Player,
    /// Game status.
    status: GameStatus,
}

impl GameState {
    /// Creates a new game with an empty board and X to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            move_count: 0,
            next: Player::X,
            status: GameStatus::InProgress,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Number of moves applied so far.
    pub fn move_count(&self) -> u8 {
        self.move_count
    }

    /// Player whose turn it is.
    pub fn next(&self) -> Player {
        self.next
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The winner, if the game was won.
    pub fn winner(&self) -> Option<Player> {
        self.status.winner()
    }

    pub(crate) fn place(&mut self, pos: usize, player: Player) {
        self.board.place(pos, player);
        self.move_count += 1;
    }

    pub(crate) fn set_next(&mut self, player: Player) {
        self.next = player;
    }

    pub(crate) fn set_status(&mut self, status: GameStatus) {
        self.status = status;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
