//! # Player Contract
//!
//! A [`Player`] mirrors the game on a private [`BoardState`] and pulls its
//! moves from a pluggable [`MoveSource`]. Drivers talk to it in a strict
//! cycle:
//!
//! ```text
//! init(size, color) -> request() -> confirm(status) -> update(move, status) -> request() ...
//! ```
//!
//! The color that moves second starts at `update`. Any call outside the
//! cycle is a [`PlayerError::Protocol`]; a disagreement between the private
//! board and the driver's status is a [`PlayerError::StatusMismatch`]. Both
//! are driver bugs and are never recovered from silently.

use crate::game::{BoardError, BoardState, BoardView, Color, Move, Status};
use crate::mcts::WorkerError;
use log::{info, warn};
use std::fmt;
use thiserror::Error;

/// Position in the request/confirm/update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Request,
    Confirm,
    Update,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Request => "request",
            Phase::Confirm => "confirm",
            Phase::Update => "update",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("`{call}` called while the player expects {phase}")]
    Protocol { call: &'static str, phase: Phase },
    #[error("status mismatch: driver reports {reported:?}, local board has {local:?}")]
    StatusMismatch { reported: Status, local: Status },
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("move source failed: {0}")]
    Source(#[from] WorkerError),
}

/// Strategy deciding the moves of a [`Player`].
///
/// `next_move` returns `None` to surrender. `observe` is called after every
/// move, own or opponent's, has been applied to the player's board.
pub trait MoveSource: Send {
    fn name(&self) -> &str;

    fn next_move(&mut self, board: &BoardState) -> Result<Option<Move>, PlayerError>;

    fn reset(&mut self, _board: &BoardState) -> Result<(), PlayerError> {
        Ok(())
    }

    fn observe(&mut self, _mv: Option<Move>, _board: &BoardState) -> Result<(), PlayerError> {
        Ok(())
    }
}

pub struct Player {
    color: Color,
    board: Option<BoardState>,
    phase: Phase,
    /// Status of the private board after the last `request`.
    pending: Status,
    source: Box<dyn MoveSource>,
}

impl Player {
    pub fn new(source: Box<dyn MoveSource>) -> Self {
        Self {
            color: Color::White,
            board: None,
            phase: Phase::Uninitialized,
            pending: Status::Ok,
            source,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read-only view of the private board, once initialized.
    pub fn view(&self) -> Option<&dyn BoardView> {
        self.board.as_ref().map(|b| b as &dyn BoardView)
    }

    /// Start a new game. May be called again at any time to restart.
    pub fn init(&mut self, size: usize, color: Color) -> Result<(), PlayerError> {
        let board = BoardState::new(size)?;
        self.source.reset(&board)?;
        self.color = color;
        self.board = Some(board);
        self.pending = Status::Ok;
        self.phase = match color {
            Color::White => Phase::Request,
            Color::Black => Phase::Update,
        };
        Ok(())
    }

    /// Propose this player's next move. `None` surrenders.
    pub fn request(&mut self) -> Result<Option<Move>, PlayerError> {
        self.expect_phase("request", Phase::Request)?;
        let board = self.board.as_mut().ok_or(PlayerError::Protocol {
            call: "request",
            phase: Phase::Uninitialized,
        })?;
        let mv = self.source.next_move(board)?;
        self.pending = board.apply_move(mv);
        self.observe(mv)?;
        self.phase = Phase::Confirm;
        Ok(mv)
    }

    /// Check the driver's status after this player's own move.
    pub fn confirm(&mut self, status: Status) -> Result<(), PlayerError> {
        self.expect_phase("confirm", Phase::Confirm)?;
        self.check_status(status, self.pending)?;
        self.phase = if status.is_ok() {
            Phase::Update
        } else {
            Phase::Finished
        };
        Ok(())
    }

    /// Apply the opponent's move and check the driver's status.
    pub fn update(&mut self, mv: Option<Move>, status: Status) -> Result<(), PlayerError> {
        self.expect_phase("update", Phase::Update)?;
        let local = self.board_mut()?.apply_move(mv);
        self.observe(mv)?;
        self.check_status(status, local)?;
        self.phase = if status.is_ok() {
            Phase::Request
        } else {
            Phase::Finished
        };
        Ok(())
    }

    fn observe(&mut self, mv: Option<Move>) -> Result<(), PlayerError> {
        let Some(board) = self.board.as_ref() else {
            return Err(self.protocol_error("observe"));
        };
        if board.status().is_ok() {
            self.source.observe(mv, board)?;
        } else {
            info!("{} ({}) sees the game end: {:?}", self.name(), self.color, board.status());
        }
        Ok(())
    }

    fn check_status(&mut self, reported: Status, local: Status) -> Result<(), PlayerError> {
        if reported == local {
            return Ok(());
        }
        self.phase = Phase::Finished;
        warn!(
            "{} ({}): driver reports {reported:?}, local board has {local:?}",
            self.name(),
            self.color
        );
        Err(PlayerError::StatusMismatch { reported, local })
    }

    fn expect_phase(&self, call: &'static str, expected: Phase) -> Result<(), PlayerError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.protocol_error(call))
        }
    }

    fn protocol_error(&self, call: &'static str) -> PlayerError {
        warn!("{} ({}): `{call}` out of turn, phase is {}", self.name(), self.color, self.phase);
        PlayerError::Protocol {
            call,
            phase: self.phase,
        }
    }

    fn board_mut(&mut self) -> Result<&mut BoardState, PlayerError> {
        let phase = self.phase;
        self.board.as_mut().ok_or(PlayerError::Protocol {
            call: "board",
            phase,
        })
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("source", &self.source.name())
            .field("color", &self.color)
            .field("phase", &self.phase)
            .finish()
    }
}
