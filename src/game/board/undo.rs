//! Reversible mutation log.
//!
//! When enabled, every primitive board mutation pushes a tagged inverse
//! record. Each `apply_move` opens a checkpoint, and [`BoardState::undo_move`]
//! replays records in reverse back to that checkpoint. This gives deep
//! lookahead an alternative to cloning the whole board per ply.

use super::{BoardState, Status, WinCause};
use crate::game::entity::{Entity, EntityId};
use crate::game::geometry::Color;

#[derive(Debug)]
pub(super) enum UndoRecord {
    Checkpoint,
    Header {
        turn: Color,
        status: Status,
        cause: Option<WinCause>,
    },
    Cell {
        index: usize,
        previous: Option<EntityId>,
    },
    Entity {
        id: EntityId,
        previous: Entity,
    },
    /// `previous` is the stale slot content when a freed slot was reused,
    /// `None` when the arena grew.
    Alloc {
        id: EntityId,
        previous: Option<Entity>,
    },
    Free,
    MovablePush {
        color: Color,
    },
    MovableRemove {
        color: Color,
        index: usize,
        id: EntityId,
    },
}

#[derive(Debug, Default)]
pub(super) struct UndoLog {
    records: Vec<UndoRecord>,
    /// Entities already snapshotted since the last checkpoint.
    snapshotted: Vec<EntityId>,
}

impl UndoLog {
    pub(super) fn begin(&mut self, turn: Color, status: Status, cause: Option<WinCause>) {
        self.snapshotted.clear();
        self.records.push(UndoRecord::Checkpoint);
        self.records.push(UndoRecord::Header { turn, status, cause });
    }

    pub(super) fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    /// Record the state of `entity` unless it was already captured for the
    /// current move.
    pub(super) fn snapshot(&mut self, id: EntityId, entity: &Entity) {
        if self.snapshotted.contains(&id) {
            return;
        }
        self.snapshotted.push(id);
        self.records.push(UndoRecord::Entity {
            id,
            previous: entity.clone(),
        });
    }

    pub(super) fn depth(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, UndoRecord::Checkpoint))
            .count()
    }
}

impl BoardState {
    /// Switch the board into reversible mode. Subsequent moves can be taken
    /// back with [`BoardState::undo_move`].
    pub fn enable_undo_log(&mut self) {
        if self.undo.is_none() {
            self.undo = Some(UndoLog::default());
        }
    }

    /// Leave reversible mode, discarding any recorded history.
    pub fn disable_undo_log(&mut self) {
        self.undo = None;
    }

    /// Number of moves that can currently be undone.
    pub fn undo_depth(&self) -> usize {
        self.undo.as_ref().map_or(0, UndoLog::depth)
    }

    /// Revert the most recent `apply_move`, restoring the exact prior state.
    /// Returns `false` if the log is disabled or empty.
    pub fn undo_move(&mut self) -> bool {
        let Some(mut log) = self.undo.take() else {
            return false;
        };

        let mut restored = false;
        while let Some(record) = log.records.pop() {
            match record {
                UndoRecord::Checkpoint => {
                    restored = true;
                    break;
                }
                UndoRecord::Header { turn, status, cause } => {
                    self.turn = turn;
                    self.status = status;
                    self.cause = cause;
                }
                UndoRecord::Cell { index, previous } => self.cells[index] = previous,
                UndoRecord::Entity { id, previous } => self.entities[id] = previous,
                UndoRecord::Alloc { id, previous } => match previous {
                    Some(stale) => {
                        self.entities[id] = stale;
                        self.free.push(id);
                    }
                    None => {
                        self.entities.pop();
                    }
                },
                UndoRecord::Free => {
                    self.free.pop();
                }
                UndoRecord::MovablePush { color } => {
                    self.movable[color.index()].pop();
                }
                UndoRecord::MovableRemove { color, index, id } => {
                    self.movable[color.index()].insert(index, id);
                }
            }
        }

        log.snapshotted.clear();
        self.undo = Some(log);
        restored
    }
}
