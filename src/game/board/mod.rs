//! # Board State
//!
//! The authoritative game board: a `size * size` grid of entity references,
//! an arena holding the entities, one ordered list of movable pieces per
//! color, the turn indicator and the terminal status.
//!
//! ## Incremental caches
//! Every movable entity carries its legal destinations. [`BoardState::apply_move`]
//! never recomputes the whole board. After the structural changes of a move it
//! 1. recomputes from scratch only the entities that moved or changed kind,
//! 2. re-derives the range of stones next to the start and end cells, adding
//!    or dropping whole distance rings,
//! 3. re-tests the start and end cells for every other entity that can reach
//!    them.
//!
//! Only the start and end cells change occupant or attributes during a move,
//! and stone ranges depend only on adjacent towers, so these three steps leave
//! every cache exactly equal to a fresh computation.
//! [`BoardState::cache_is_consistent`] checks that property.
//!
//! ## Failure semantics
//! Legality is checked against the mover's cache before anything is touched.
//! An illegal request only flips the status to [`Status::Illegal`]; once the
//! check passes the move always plays to completion.

mod undo;

use super::entity::{Destinations, Entity, EntityId};
use super::geometry::{distance, neighbors, positions_at_distance, Color, Position};
use super::notation::Move;
use log::trace;
use thiserror::Error;
use undo::{UndoLog, UndoRecord};

/// Smallest supported board.
pub const MIN_SIZE: usize = 6;
/// Largest supported board (limited by single-letter column notation).
pub const MAX_SIZE: usize = 26;

/// Game-over indicator of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The game is in progress.
    Ok,
    /// The given color has won.
    Win(Color),
    /// An illegal move was submitted.
    Illegal,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Status::Win(color) => Some(color),
            _ => None,
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinCause {
    BaseDestroyed,
    NoPossibleMoves,
    Surrender,
    IllegalMove,
}

/// Errors raised while building a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board size {0} is outside {min}..={max}", min = MIN_SIZE, max = MAX_SIZE)]
    InvalidSize(usize),
    #[error("position {0} is not on the board")]
    OffBoard(Position),
    #[error("position {0} is already occupied")]
    Occupied(Position),
    #[error("height {0} exceeds the maximum tower height {1}")]
    BadHeight(u8, u8),
}

/// What ends up travelling to the destination cell.
#[derive(Debug, Clone, Copy)]
enum Mover {
    /// A stone leaving its cell.
    Stone(EntityId),
    /// The top stone detached from a tower; it has no entity yet.
    Detached,
}

/// Complete state of one game.
#[derive(Debug)]
pub struct BoardState {
    size: usize,
    max_height: u8,
    cells: Vec<Option<EntityId>>,
    entities: Vec<Entity>,
    free: Vec<EntityId>,
    movable: [Vec<EntityId>; 2],
    turn: Color,
    status: Status,
    cause: Option<WinCause>,
    undo: Option<UndoLog>,
}

impl Clone for BoardState {
    /// Deep copy of the grid, arena and movable lists. The undo log is not
    /// carried over.
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            max_height: self.max_height,
            cells: self.cells.clone(),
            entities: self.entities.clone(),
            free: self.free.clone(),
            movable: self.movable.clone(),
            turn: self.turn,
            status: self.status,
            cause: self.cause,
            undo: None,
        }
    }
}

impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.cells == other.cells
            && self.entities == other.entities
            && self.free == other.free
            && self.movable == other.movable
            && self.turn == other.turn
            && self.status == other.status
            && self.cause == other.cause
    }
}

impl Eq for BoardState {}

impl BoardState {
    /// Create a board in the starting position: both bases in their corners
    /// and a stone on every cell within `size / 3` of each base.
    pub fn new(size: usize) -> Result<Self, BoardError> {
        let mut board = Self::empty(size)?;
        let radius = size / 3;
        for color in Color::both() {
            let base = board.base_position(color);
            for r in 1..=radius {
                for pos in positions_at_distance(base, r, size) {
                    let id = board.alloc(Entity::stone(pos, color, size));
                    board.write_cell(pos, Some(id));
                    board.movable_push(color, id);
                }
            }
        }
        board.rebuild_caches();
        Ok(board)
    }

    /// A board holding only the two bases, for custom setups via
    /// [`BoardState::place`].
    pub fn empty(size: usize) -> Result<Self, BoardError> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return Err(BoardError::InvalidSize(size));
        }
        let mut board = Self {
            size,
            max_height: (size / 3) as u8,
            cells: vec![None; size * size],
            entities: Vec::new(),
            free: Vec::new(),
            movable: [Vec::new(), Vec::new()],
            turn: Color::White,
            status: Status::Ok,
            cause: None,
            undo: None,
        };
        for color in Color::both() {
            let pos = board.base_position(color);
            let id = board.alloc(Entity::base(pos, color, size));
            board.write_cell(pos, Some(id));
        }
        Ok(board)
    }

    /// Put a piece on an empty cell. `height` 0 places a stone; `blocked` is
    /// ignored for stones. All caches are rebuilt afterwards.
    pub fn place(
        &mut self,
        pos: Position,
        color: Color,
        height: u8,
        blocked: bool,
    ) -> Result<(), BoardError> {
        if !pos.on_board(self.size) {
            return Err(BoardError::OffBoard(pos));
        }
        if self.occupant_id(pos).is_some() {
            return Err(BoardError::Occupied(pos));
        }
        if height > self.max_height {
            return Err(BoardError::BadHeight(height, self.max_height));
        }
        let mut entity = Entity::stone(pos, color, self.size);
        entity.height = height;
        entity.blocked = blocked && height > 0;
        let id = self.alloc(entity);
        self.write_cell(pos, Some(id));
        self.movable_push(color, id);
        self.rebuild_caches();
        Ok(())
    }

    /// Override the side to move (setup only).
    pub fn set_turn(&mut self, color: Color) {
        self.turn = color;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_height(&self) -> u8 {
        self.max_height
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn win_cause(&self) -> Option<WinCause> {
        self.cause
    }

    /// Fixed corner holding the base of `color`.
    pub fn base_position(&self, color: Color) -> Position {
        match color {
            Color::White => Position::new(1, 1),
            Color::Black => Position::new(self.size as u8, self.size as u8),
        }
    }

    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        if !pos.on_board(self.size) {
            return None;
        }
        self.occupant(pos)
    }

    /// Movable pieces of `color` in list order (bases excluded).
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = &Entity> + '_ {
        self.movable[color.index()].iter().map(|&id| &self.entities[id])
    }

    pub fn piece_count(&self, color: Color) -> usize {
        self.movable[color.index()].len()
    }

    /// Legal destinations of the piece at `pos`, nearest first.
    pub fn destinations_at(&self, pos: Position) -> Vec<Position> {
        self.entity_at(pos)
            .map(|e| e.destinations().iter().collect())
            .unwrap_or_default()
    }

    /// Every move available to `color`, in piece-list order.
    pub fn all_possible_moves(&self, color: Color) -> Vec<Move> {
        self.pieces(color)
            .flat_map(|e| e.destinations().iter().map(move |to| Move::new(e.position, to)))
            .collect()
    }

    pub fn has_moves(&self, color: Color) -> bool {
        self.pieces(color).any(Entity::can_move)
    }

    /// Whether `mv` would pass the legality check for the side to move.
    pub fn is_legal(&self, mv: &Move) -> bool {
        if !self.status.is_ok() || !mv.to.on_board(self.size) {
            return false;
        }
        match self.entity_at(mv.from) {
            Some(e) if e.color == self.turn && !e.is_base => {
                let d = distance(mv.from, mv.to);
                d > 0 && e.destinations.contains_at(mv.to, d)
            }
            _ => false,
        }
    }

    /// Differential oracle: recompute every cache and range from scratch and
    /// compare with the incrementally maintained values. Also checks that
    /// grid cells, entity positions and movable lists agree.
    pub fn cache_is_consistent(&self) -> bool {
        let mut listed = 0;
        for color in Color::both() {
            for &id in &self.movable[color.index()] {
                let e = &self.entities[id];
                let placed = self.cells[e.position.index(self.size)] == Some(id);
                if e.color != color || e.is_base || !placed {
                    return false;
                }
                if e.is_stone() && e.range != self.computed_range(e.position, e.color) {
                    return false;
                }
                if e.destinations.ring_count() != e.reach()
                    || !e.destinations.same_set(&self.fresh_destinations(id))
                {
                    return false;
                }
                listed += 1;
            }
        }
        let occupied_pieces = self
            .cells
            .iter()
            .flatten()
            .filter(|&&id| !self.entities[id].is_base)
            .count();
        occupied_pieces == listed
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Play `mv` for the side to move. `None` surrenders.
    ///
    /// Returns the resulting status. An illegal request sets the status to
    /// [`Status::Illegal`] and leaves pieces and turn untouched; a request on
    /// a board that is already decided returns `Illegal` without changing
    /// anything.
    pub fn apply_move(&mut self, mv: Option<Move>) -> Status {
        if let Some(log) = self.undo.as_mut() {
            log.begin(self.turn, self.status, self.cause);
        }
        if !self.status.is_ok() {
            trace!("move {:?} rejected: game already decided", mv);
            return Status::Illegal;
        }

        let Some(mv) = mv else {
            self.status = Status::Win(self.turn.opponent());
            self.cause = Some(WinCause::Surrender);
            self.turn = self.turn.opponent();
            return self.status;
        };

        if !self.is_legal(&mv) {
            trace!("illegal move {} by {}", mv, self.turn);
            self.status = Status::Illegal;
            self.cause = Some(WinCause::IllegalMove);
            return self.status;
        }

        let color = self.turn;
        let opponent = color.opponent();
        let travel = distance(mv.from, mv.to);
        let mut dirty: Vec<EntityId> = Vec::new();

        let mover = self.lift_mover(mv.from, &mut dirty);
        let base_destroyed = self.land_mover(mover, mv.to, color, travel, &mut dirty);

        for id in dirty {
            if self.cells[self.entities[id].position.index(self.size)] == Some(id) {
                self.recompute(id);
            }
        }
        self.rerange_around(mv.from);
        self.rerange_around(mv.to);
        self.refresh_cell(mv.from);
        self.refresh_cell(mv.to);

        if base_destroyed {
            self.status = Status::Win(color);
            self.cause = Some(WinCause::BaseDestroyed);
        } else if !self.has_moves(opponent) {
            self.status = Status::Win(color);
            self.cause = Some(WinCause::NoPossibleMoves);
        } else {
            self.turn = opponent;
        }
        self.status
    }

    /// Start-side effects: a stone vacates its cell, a tower sheds its top
    /// stone and shrinks (turning back into a stone at height zero).
    fn lift_mover(&mut self, from: Position, dirty: &mut Vec<EntityId>) -> Mover {
        let Some(id) = self.occupant_id(from) else {
            unreachable!("legality check guarantees a piece at the start cell");
        };
        if self.entities[id].is_tower() {
            let tower = self.entity_mut(id);
            tower.height -= 1;
            if tower.height == 0 {
                tower.range = 1;
                dirty.push(id);
            }
            Mover::Detached
        } else {
            self.write_cell(from, None);
            Mover::Stone(id)
        }
    }

    /// End-side effects, by what occupies the destination. Returns whether
    /// the opponent's base was hit.
    fn land_mover(
        &mut self,
        mover: Mover,
        to: Position,
        color: Color,
        travel: usize,
        dirty: &mut Vec<EntityId>,
    ) -> bool {
        let Some(target_id) = self.occupant_id(to) else {
            self.place_mover(mover, to, color, dirty);
            return false;
        };

        let target = &self.entities[target_id];
        if target.color != color {
            if target.is_base {
                self.absorb_mover(mover, color);
                return true;
            }
            if target.is_tower() && travel > 1 {
                // Remote strike: the tower is disarmed, the striker is spent.
                let tower = self.entity_mut(target_id);
                tower.blocked = true;
                tower.destinations.clear();
                self.absorb_mover(mover, color);
            } else {
                self.remove_piece(target_id);
                self.place_mover(mover, to, color, dirty);
            }
            return false;
        }

        // Own piece: unblock a blocked tower, otherwise stack on it.
        let target = self.entity_mut(target_id);
        if target.blocked {
            target.blocked = false;
        } else {
            target.height += 1;
            target.range = 1;
        }
        dirty.push(target_id);
        self.absorb_mover(mover, color);
        false
    }

    fn place_mover(&mut self, mover: Mover, to: Position, color: Color, dirty: &mut Vec<EntityId>) {
        let id = match mover {
            Mover::Stone(id) => {
                self.entity_mut(id).position = to;
                id
            }
            Mover::Detached => {
                let id = self.alloc(Entity::stone(to, color, self.size));
                self.movable_push(color, id);
                id
            }
        };
        self.write_cell(to, Some(id));
        dirty.push(id);
    }

    /// The mover leaves play (consumed into a tower, spent on a strike, or
    /// spent on the enemy base).
    fn absorb_mover(&mut self, mover: Mover, color: Color) {
        if let Mover::Stone(id) = mover {
            self.movable_remove(color, id);
            self.free(id);
        }
    }

    /// Remove a captured piece from the grid, its movable list and the arena.
    fn remove_piece(&mut self, id: EntityId) {
        let (pos, color) = (self.entities[id].position, self.entities[id].color);
        self.write_cell(pos, None);
        self.movable_remove(color, id);
        self.free(id);
    }

    // ------------------------------------------------------------------
    // Cache maintenance
    // ------------------------------------------------------------------

    /// Whether a piece of `color` may end a move of length `travel` on `pos`.
    fn legal_destination(&self, pos: Position, color: Color, travel: usize) -> bool {
        match self.occupant(pos) {
            None => true,
            Some(target) if target.color != color => {
                target.is_base
                    || !(target.is_tower() && target.blocked && target.height == self.max_height)
                    || travel == 1
            }
            Some(target) => !target.is_base && (target.height < self.max_height || target.blocked),
        }
    }

    /// Range a stone of `color` standing on `pos` should have.
    fn computed_range(&self, pos: Position, color: Color) -> usize {
        1 + neighbors(pos, self.size)
            .into_iter()
            .filter_map(|q| self.occupant(q))
            .filter(|e| e.color == color)
            .map(Entity::range_bonus)
            .sum::<usize>()
    }

    fn legal_ring(&self, pos: Position, color: Color, travel: usize) -> Vec<Position> {
        positions_at_distance(pos, travel, self.size)
            .into_iter()
            .filter(|&p| self.legal_destination(p, color, travel))
            .collect()
    }

    fn fresh_destinations(&self, id: EntityId) -> Destinations {
        let e = &self.entities[id];
        let mut fresh = Destinations::new(self.size);
        let reach = if e.is_stone() {
            self.computed_range(e.position, e.color)
        } else {
            e.reach()
        };
        for travel in 1..=reach {
            fresh.push_ring(self.legal_ring(e.position, e.color, travel));
        }
        fresh
    }

    /// Rebuild one entity's range and cache from scratch.
    fn recompute(&mut self, id: EntityId) {
        let e = &self.entities[id];
        let range = if e.is_stone() {
            self.computed_range(e.position, e.color)
        } else {
            1
        };
        let fresh = self.fresh_destinations(id);
        let e = self.entity_mut(id);
        e.range = range;
        e.destinations = fresh;
    }

    fn rebuild_caches(&mut self) {
        let ids: Vec<EntityId> = self.movable.iter().flatten().copied().collect();
        for id in ids {
            self.recompute(id);
        }
    }

    /// Change a stone's range by adding or dropping outer distance rings.
    fn set_range(&mut self, id: EntityId, range: usize) {
        let e = &self.entities[id];
        let old = e.range;
        if old == range {
            return;
        }
        let (pos, color) = (e.position, e.color);
        let added: Vec<Vec<Position>> = (old + 1..=range)
            .map(|travel| self.legal_ring(pos, color, travel))
            .collect();

        let e = self.entity_mut(id);
        e.range = range;
        if range > old {
            for ring in added {
                e.destinations.push_ring(ring);
            }
        } else {
            for _ in range..old {
                e.destinations.pop_ring();
            }
        }
    }

    /// Re-derive the range of every stone adjacent to `pos`.
    fn rerange_around(&mut self, pos: Position) {
        for q in neighbors(pos, self.size) {
            let Some(id) = self.occupant_id(q) else { continue };
            let e = &self.entities[id];
            if e.is_stone() {
                let range = self.computed_range(q, e.color);
                self.set_range(id, range);
            }
        }
    }

    /// Re-test `pos` for every piece whose reach covers it.
    fn refresh_cell(&mut self, pos: Position) {
        for color in Color::both() {
            for i in 0..self.movable[color.index()].len() {
                let id = self.movable[color.index()][i];
                let e = &self.entities[id];
                let travel = distance(e.position, pos);
                if travel == 0 || travel > e.reach() {
                    continue;
                }
                let legal = self.legal_destination(pos, color, travel);
                if e.destinations.contains(pos) != legal {
                    self.entity_mut(id).destinations.set(travel, pos, legal);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Logged primitives
    // ------------------------------------------------------------------

    fn occupant_id(&self, pos: Position) -> Option<EntityId> {
        self.cells[pos.index(self.size)]
    }

    fn occupant(&self, pos: Position) -> Option<&Entity> {
        self.occupant_id(pos).map(|id| &self.entities[id])
    }

    fn write_cell(&mut self, pos: Position, value: Option<EntityId>) {
        let index = pos.index(self.size);
        if let Some(log) = self.undo.as_mut() {
            log.push(UndoRecord::Cell {
                index,
                previous: self.cells[index],
            });
        }
        self.cells[index] = value;
    }

    fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        if let Some(log) = self.undo.as_mut() {
            log.snapshot(id, &self.entities[id]);
        }
        &mut self.entities[id]
    }

    fn alloc(&mut self, entity: Entity) -> EntityId {
        let (id, previous) = match self.free.pop() {
            Some(id) => (id, Some(std::mem::replace(&mut self.entities[id], entity))),
            None => {
                self.entities.push(entity);
                (self.entities.len() - 1, None)
            }
        };
        if let Some(log) = self.undo.as_mut() {
            log.push(UndoRecord::Alloc { id, previous });
        }
        id
    }

    fn free(&mut self, id: EntityId) {
        self.free.push(id);
        if let Some(log) = self.undo.as_mut() {
            log.push(UndoRecord::Free);
        }
    }

    fn movable_push(&mut self, color: Color, id: EntityId) {
        self.movable[color.index()].push(id);
        if let Some(log) = self.undo.as_mut() {
            log.push(UndoRecord::MovablePush { color });
        }
    }

    fn movable_remove(&mut self, color: Color, id: EntityId) {
        let list = &mut self.movable[color.index()];
        if let Some(index) = list.iter().position(|&x| x == id) {
            list.remove(index);
            if let Some(log) = self.undo.as_mut() {
                log.push(UndoRecord::MovableRemove { color, index, id });
            }
        }
    }
}
