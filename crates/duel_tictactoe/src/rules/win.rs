//! Win detection logic for tic-tac-toe.

use super::super::{Board, Player, Square};
use tracing::instrument;

/// The eight winning lines as board indices, in scan order:
/// rows, then columns, then diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Checks if there is a winner on the board.
///
/// Returns the owner of the first uniform line found in
/// [`WINNING_LINES`] order, `None` otherwise.
#[instrument(level = "trace", skip(board), fields(board = %board))]
pub fn check_winner(board: &Board) -> Option<Player> {
    for [a, b, c] in WINNING_LINES {
        let sq = board.get(a);
        if let Some(Square::Occupied(player)) = sq
            && sq == board.get(b)
            && sq == board.get(c)
        {
            return Some(player);
        }
    }

    None
}
