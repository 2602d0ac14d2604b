//! Read-only access to a board for renderers and IO drivers.

use super::board::{BoardState, Status};
use super::geometry::{Color, Position};

/// Attributes of the piece occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub color: Color,
    pub height: u8,
    pub blocked: bool,
    pub is_base: bool,
}

/// Query surface offered to renderers. Implementors never expose mutation.
pub trait BoardView {
    fn size(&self) -> usize;
    fn turn(&self) -> Color;
    fn status(&self) -> Status;
    /// `None` for empty or off-board cells.
    fn cell(&self, pos: Position) -> Option<CellView>;
    /// Legal destinations of the piece at `pos` (empty when there is none).
    fn destinations(&self, pos: Position) -> Vec<Position>;

    fn is_empty(&self, pos: Position) -> bool {
        self.cell(pos).is_none()
    }
}

impl BoardView for BoardState {
    fn size(&self) -> usize {
        BoardState::size(self)
    }

    fn turn(&self) -> Color {
        BoardState::turn(self)
    }

    fn status(&self) -> Status {
        BoardState::status(self)
    }

    fn cell(&self, pos: Position) -> Option<CellView> {
        self.entity_at(pos).map(|e| CellView {
            color: e.color(),
            height: e.height(),
            blocked: e.is_blocked(),
            is_base: e.is_base(),
        })
    }

    fn destinations(&self, pos: Position) -> Vec<Position> {
        self.destinations_at(pos)
    }
}
