//! # Hexfort Game Implementation
//!
//! Rules engine for a two-player game on a rhombus-shaped hex board.
//!
//! ## Game Overview
//! Each side owns a base in one corner and a cluster of stones around it.
//! - **Stones** travel up to their range in a single jump.
//! - **Towers** are stacks of same-color stones (height `1..=size/3`). They
//!   move by sending their top stone one step and lend their height as extra
//!   range to adjacent friendly stones.
//! - Moving onto a friendly stone or tower stacks onto it; moving onto a
//!   friendly blocked tower unblocks it.
//! - Moving onto an enemy stone, or an adjacent enemy tower, captures it.
//!   Striking an enemy tower from two or more steps away blocks it instead,
//!   and the striking stone is spent.
//!
//! A side wins by landing on the enemy base or by leaving the enemy without
//! any legal move.
//!
//! ## Layout
//! - [`geometry`]: coordinates, hex distance and ring enumeration
//! - [`entity`]: pieces and their destination caches
//! - [`board`]: the incremental board engine
//! - [`notation`]: `A1->B2` move notation
//! - [`view`]: the read-only view offered to renderers

pub mod board;
pub mod entity;
pub mod geometry;
pub mod notation;
pub mod view;

pub use board::{BoardError, BoardState, Status, WinCause, MAX_SIZE, MIN_SIZE};
pub use entity::{Destinations, Entity};
pub use geometry::{distance, positions_at_distance, Color, Position};
pub use notation::{Move, ParseError};
pub use view::{BoardView, CellView};
