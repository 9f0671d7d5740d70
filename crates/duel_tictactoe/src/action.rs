//! First-class action types for tic-tac-toe.
//!
//! Moves are domain events, not side effects. They carry the player's
//! intent exactly as it arrived and are validated by [`Game::apply_move`].
//!
//! [`Game::apply_move`]: crate::Game::apply_move

use super::Player;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// A move: a player asking to place their mark at a row and column.
///
/// Coordinates are signed and unchecked so that out-of-range requests
/// from the network can be represented and rejected by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// The player making the move.
    pub player: Player,
    /// Requested row (valid range 0-2).
    pub row: i64,
    /// Requested column (valid range 0-2).
    pub col: i64,
}

impl Move {
    /// Creates a new move.
    pub fn new(player: Player, row: i64, col: i64) -> Self {
        Self { player, row, col }
    }

    /// Row-major board index, if the coordinates are on the board.
    pub fn index(&self) -> Option<usize> {
        let in_range = |v: i64| (0..3).contains(&v);
        if in_range(self.row) && in_range(self.col) {
            Some((self.row * 3 + self.col) as usize)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> ({}, {})", self.player, self.row, self.col)
    }
}

/// Rule violation raised when a move cannot be applied.
///
/// The display text is what the offending client is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum MoveError {
    /// The game already reached a terminal status.
    #[display("game is already finished")]
    GameFinished,

    /// The mover is not the player whose turn it is.
    #[display("not your turn")]
    WrongTurn,

    /// Row or column outside 0-2.
    #[display("move out of bounds")]
    OutOfBounds,

    /// The target square already holds a mark.
    #[display("cell already occupied")]
    CellOccupied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_in_range() {
        assert_eq!(Move::new(Player::X, 0, 0).index(), Some(0));
        assert_eq!(Move::new(Player::X, 1, 2).index(), Some(5));
        assert_eq!(Move::new(Player::O, 2, 2).index(), Some(8));
    }

    #[test]
    fn test_index_out_of_range() {
        assert_eq!(Move::new(Player::X, -1, 0).index(), None);
        assert_eq!(Move::new(Player::X, 0, 3).index(), None);
        assert_eq!(Move::new(Player::X, i64::MAX, 1).index(), None);
    }

    #[test]
    fn test_error_text() {
        assert_eq!(MoveError::WrongTurn.to_string(), "not your turn");
        assert_eq!(MoveError::CellOccupied.to_string(), "cell already occupied");
    }
}
