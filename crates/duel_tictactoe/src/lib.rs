//! Tic-tac-toe rules for networked two-player sessions.
//!
//! This crate is pure: no I/O, no concurrency. A [`Game`] owns a
//! [`GameState`] and only changes it through [`Game::apply_move`] (rule
//! driven) or [`Game::abandon`] (a participant left).
//!
//! # Example
//!
//! ```
//! use duel_tictactoe::{Game, GameStatus, Move, Player};
//!
//! let mut game = Game::new();
//! game.apply_move(Move::new(Player::X, 1, 1)).unwrap();
//! assert_eq!(game.status(), GameStatus::InProgress);
//! assert_eq!(game.next(), Player::O);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod game;
pub mod rules;
mod types;

pub use action::{Move, MoveError};
pub use game::Game;
pub use types::{Board, BoardParseError, GameState, GameStatus, Player, Square};
