//! Game engine for tic-tac-toe.

use super::action::{Move, MoveError};
use super::rules::{check_winner, is_full};
use super::types::{Board, GameState, GameStatus, Player};
use tracing::{debug, instrument};

/// Tic-tac-toe game engine.
///
/// Wraps a [`GameState`] and is the only way to change it. Every
/// transition validates first and mutates second, so a rejected move
/// leaves the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Game {
    state: GameState,
}

impl Game {
    /// Creates a new game: empty board, X to move.
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
        }
    }

    /// Returns the current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Shorthand for the board.
    pub fn board(&self) -> &Board {
        self.state.board()
    }

    /// Shorthand for the status.
    pub fn status(&self) -> GameStatus {
        self.state.status()
    }

    /// Checks a move against the rules without applying it.
    ///
    /// Preconditions are checked in a fixed order: terminal status,
    /// turn, bounds, occupancy.
    pub fn validate(&self, mv: &Move) -> Result<usize, MoveError> {
        if self.state.status().is_terminal() {
            return Err(MoveError::GameFinished);
        }
        if mv.player != self.state.next() {
            return Err(MoveError::WrongTurn);
        }
        let pos = mv.index().ok_or(MoveError::OutOfBounds)?;
        if !self.state.board().is_empty(pos) {
            return Err(MoveError::CellOccupied);
        }
        Ok(pos)
    }

    /// Applies a move and advances the status.
    ///
    /// After placing the mark, a completed line wins; otherwise a ninth
    /// mark draws; otherwise the turn passes to the opponent.
    #[instrument(skip(self), fields(player = %mv.player, row = mv.row, col = mv.col))]
    pub fn apply_move(&mut self, mv: Move) -> Result<GameStatus, MoveError> {
        let pos = self.validate(&mv)?;

        self.state.place(pos, mv.player);
        if let Some(winner) = check_winner(self.state.board()) {
            self.state.set_status(GameStatus::Won(winner));
        } else if is_full(self.state.board()) {
            self.state.set_status(GameStatus::Draw);
        } else {
            self.state.set_next(mv.player.opponent());
        }

        debug!(
            board = %self.state.board(),
            status = ?self.state.status(),
            "Move applied"
        );
        Ok(self.state.status())
    }

    /// Same as [`Game::apply_move`] but returns the successor game and
    /// leaves `self` as it was.
    pub fn with_move(&self, mv: Move) -> Result<Game, MoveError> {
        let mut next = self.clone();
        next.apply_move(mv)?;
        Ok(next)
    }

    /// Ends an in-progress game because a participant left.
    ///
    /// Returns `false` and changes nothing if the game was already over.
    pub fn abandon(&mut self) -> bool {
        if self.state.status().is_terminal() {
            return false;
        }
        self.state.set_status(GameStatus::Abandoned);
        true
    }

    /// Player to move next.
    pub fn next(&self) -> Player {
        self.state.next()
    }
}
