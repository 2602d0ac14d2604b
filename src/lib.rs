//! # Hexfort
//!
//! Decision engine for a two-player hex strategy game: stones merge into
//! height-limited towers, towers extend the range of neighbouring stones, and
//! a side wins by reaching the enemy base or leaving the enemy without moves.
//!
//! ## Architecture
//! - [`game`]: the incremental board engine. Every piece caches its legal
//!   destinations and the caches are patched, not rebuilt, after each move.
//! - [`evaluator`]: heuristic move scoring shared by players and playouts.
//! - [`mcts`]: time-bounded, optionally parallel Monte Carlo Tree Search with
//!   tree reuse and a background worker thread.
//! - [`player`]: the request/confirm/update contract around a pluggable
//!   [`MoveSource`](player::MoveSource).
//! - [`strategies`]: random, heuristic, lookahead and search move sources.
//! - [`game_controller`]: the authoritative board and a match driver.
//!
//! ## Logging
//! The crate logs through the `log` facade and installs no sink itself; it
//! stays silent until the embedding program sets up a logger.

pub mod evaluator;
pub mod game;
pub mod game_controller;
pub mod mcts;
pub mod player;
pub mod strategies;

pub use game::{BoardState, BoardView, Color, Move, Position, Status, WinCause};
pub use game_controller::{play_match, GameController, MatchReport, Outcome};
pub use mcts::{FinalSelection, Mcts, PlayoutPolicy, SearchConfig, SearchStatistics};
pub use player::{MoveSource, Player, PlayerError};
