//! # Game Controller
//!
//! Owns the authoritative [`BoardState`] of a match. Players keep private
//! mirrors; every move is submitted here first and the resulting status is
//! what drivers pass back through `confirm`/`update`.
//!
//! ```text
//!            request()                submit(move)
//!   Player ───────────► driver ───────────────────► GameController
//!     ▲                    │                              │
//!     └── confirm(status) ─┤◄─────────── status ──────────┘
//!   Other ◄─ update(move, status)
//! ```
//!
//! An illegal submission ends the match: the other side wins by
//! [`WinCause::IllegalMove`].

use crate::game::{BoardError, BoardState, BoardView, Color, Move, Status, WinCause};
use crate::player::{Player, PlayerError};
use log::info;
use std::fmt::Write as _;
use std::time::SystemTime;

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Color,
    pub cause: WinCause,
}

/// A single entry in the move history.
#[derive(Debug, Clone)]
pub struct MoveHistoryEntry {
    pub timestamp: SystemTime,
    pub player: Color,
    /// `None` is a surrender.
    pub move_made: Option<Move>,
    /// 1-indexed.
    pub move_number: usize,
}

impl MoveHistoryEntry {
    pub fn new(player: Color, move_made: Option<Move>, move_number: usize) -> Self {
        Self {
            timestamp: SystemTime::now(),
            player,
            move_made,
            move_number,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameController {
    board: BoardState,
    move_history: Vec<MoveHistoryEntry>,
    outcome: Option<Outcome>,
}

impl GameController {
    pub fn new(size: usize) -> Result<Self, BoardError> {
        Ok(Self::from_board(BoardState::new(size)?))
    }

    /// Continue from an arbitrary position.
    pub fn from_board(board: BoardState) -> Self {
        let outcome = board
            .status()
            .winner()
            .zip(board.win_cause())
            .map(|(winner, cause)| Outcome { winner, cause });
        Self {
            board,
            move_history: Vec::new(),
            outcome,
        }
    }

    /// Apply `mv` for the side to move and return the board's status.
    ///
    /// `Status::Illegal` is returned as-is so players can confirm it, but the
    /// controller records the match as lost by the submitter.
    pub fn submit(&mut self, mv: Option<Move>) -> Status {
        if self.outcome.is_some() {
            return Status::Illegal;
        }
        let player = self.board.turn();
        let status = self.board.apply_move(mv);
        self.move_history
            .push(MoveHistoryEntry::new(player, mv, self.move_history.len() + 1));

        self.outcome = match status {
            Status::Ok => None,
            Status::Illegal => Some(Outcome {
                winner: player.opponent(),
                cause: WinCause::IllegalMove,
            }),
            Status::Win(winner) => Some(Outcome {
                winner,
                cause: self.board.win_cause().unwrap_or(WinCause::BaseDestroyed),
            }),
        };
        if let Some(outcome) = self.outcome {
            info!(
                "{} wins after {} moves ({:?})",
                outcome.winner,
                self.move_history.len(),
                outcome.cause
            );
        }
        status
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn view(&self) -> &dyn BoardView {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn move_history(&self) -> &[MoveHistoryEntry] {
        &self.move_history
    }

    pub fn move_count(&self) -> usize {
        self.move_history.len()
    }

    pub fn last_move(&self) -> Option<&MoveHistoryEntry> {
        self.move_history.last()
    }

    /// Move list in notation, one move per line.
    pub fn format_history(&self) -> String {
        let mut output = String::new();
        for entry in &self.move_history {
            let notation = entry
                .move_made
                .map_or_else(|| "surrender".to_string(), |mv| mv.to_string());
            let _ = writeln!(output, "{}. {} {}", entry.move_number, entry.player, notation);
        }
        match self.outcome {
            Some(outcome) => {
                let _ = writeln!(output, "Result: {} wins ({:?})", outcome.winner, outcome.cause);
            }
            None => {
                let _ = writeln!(output, "({} to move)", self.board.turn());
            }
        }
        output
    }
}

/// Summary of a completed [`play_match`] call.
#[derive(Debug, Clone)]
pub struct MatchReport {
    /// `None` when the turn limit was reached first.
    pub outcome: Option<Outcome>,
    pub turns: usize,
    pub controller: GameController,
}

/// Run the request/confirm/update cycle between two initialized players
/// until the game ends or `max_turns` moves have been made.
pub fn play_match(
    white: &mut Player,
    black: &mut Player,
    max_turns: usize,
) -> Result<MatchReport, PlayerError> {
    let size = white
        .view()
        .map(|v| v.size())
        .ok_or(PlayerError::Protocol {
            call: "play_match",
            phase: white.phase(),
        })?;
    let mut controller = GameController::new(size)?;

    while !controller.is_game_over() && controller.move_count() < max_turns {
        let (mover, other) = match controller.turn() {
            Color::White => (&mut *white, &mut *black),
            Color::Black => (&mut *black, &mut *white),
        };
        let mv = mover.request()?;
        let status = controller.submit(mv);
        mover.confirm(status)?;
        other.update(mv, status)?;
    }

    Ok(MatchReport {
        outcome: controller.outcome(),
        turns: controller.move_count(),
        controller,
    })
}
