//! # Entities and Destination Caches
//!
//! An [`Entity`] is a single piece on the board: a stone (height 0), a tower
//! (height `1..=max_height`) or a base. Each entity carries its legal
//! destinations partitioned by travel distance together with a cell bitmask
//! for constant-time membership tests. The board engine keeps these caches
//! exact after every mutation; nothing here knows about the board.

use super::geometry::{Color, Position};

/// Index of an entity in the board's entity arena.
pub type EntityId = usize;

/// Legal destinations of one entity, grouped by travel distance.
///
/// `rings[d - 1]` holds the destinations exactly `d` steps away. The `mask`
/// mirrors the union of all rings, one bit per board cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    rings: Vec<Vec<Position>>,
    mask: Vec<u64>,
    size: usize,
}

impl Destinations {
    pub fn new(size: usize) -> Self {
        Self {
            rings: Vec::new(),
            mask: vec![0; (size * size).div_ceil(64)],
            size,
        }
    }

    /// Number of distance rings currently cached (equals the entity's reach).
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Destinations exactly `distance` steps away.
    pub fn ring(&self, distance: usize) -> &[Position] {
        distance
            .checked_sub(1)
            .and_then(|i| self.rings.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        let idx = pos.index(self.size);
        self.mask[idx / 64] & (1 << (idx % 64)) != 0
    }

    /// Membership test restricted to one travel distance.
    pub fn contains_at(&self, pos: Position, distance: usize) -> bool {
        self.contains(pos) && self.ring(distance).contains(&pos)
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// All cached destinations, nearest ring first.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.rings.iter().flatten().copied()
    }

    pub fn clear(&mut self) {
        self.rings.clear();
        self.mask.iter_mut().for_each(|w| *w = 0);
    }

    /// Append the next ring outward. Its distance is `ring_count() + 1`.
    pub fn push_ring(&mut self, ring: Vec<Position>) {
        for &pos in &ring {
            self.set_bit(pos, true);
        }
        self.rings.push(ring);
    }

    /// Drop the outermost ring, leaving closer rings untouched.
    pub fn pop_ring(&mut self) {
        if let Some(ring) = self.rings.pop() {
            for pos in ring {
                self.set_bit(pos, false);
            }
        }
    }

    /// Force membership of `pos` in ring `distance` to `legal`.
    /// Returns whether anything changed.
    pub fn set(&mut self, distance: usize, pos: Position, legal: bool) -> bool {
        let Some(ring) = distance.checked_sub(1).and_then(|i| self.rings.get_mut(i)) else {
            return false;
        };
        let present = ring.iter().position(|&p| p == pos);
        match (present, legal) {
            (None, true) => {
                ring.push(pos);
                self.set_bit(pos, true);
                true
            }
            (Some(i), false) => {
                ring.swap_remove(i);
                self.set_bit(pos, false);
                true
            }
            _ => false,
        }
    }

    /// Order-insensitive comparison, used by the cache audit.
    pub fn same_set(&self, other: &Destinations) -> bool {
        if self.mask != other.mask || self.rings.len() != other.rings.len() {
            return false;
        }
        self.rings.iter().zip(&other.rings).all(|(a, b)| {
            let mut a = a.clone();
            let mut b = b.clone();
            a.sort();
            b.sort();
            a == b
        })
    }

    fn set_bit(&mut self, pos: Position, on: bool) {
        let idx = pos.index(self.size);
        if on {
            self.mask[idx / 64] |= 1 << (idx % 64);
        } else {
            self.mask[idx / 64] &= !(1 << (idx % 64));
        }
    }
}

/// A stone, tower or base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub(crate) position: Position,
    pub(crate) color: Color,
    /// 0 for stones, `1..=max_height` for towers.
    pub(crate) height: u8,
    /// Only ever set on towers.
    pub(crate) blocked: bool,
    /// Travel distance of a stone. Towers keep 1.
    pub(crate) range: usize,
    pub(crate) is_base: bool,
    pub(crate) destinations: Destinations,
}

impl Entity {
    pub(crate) fn stone(position: Position, color: Color, size: usize) -> Self {
        Self {
            position,
            color,
            height: 0,
            blocked: false,
            range: 1,
            is_base: false,
            destinations: Destinations::new(size),
        }
    }

    pub(crate) fn base(position: Position, color: Color, size: usize) -> Self {
        Self {
            is_base: true,
            range: 0,
            ..Self::stone(position, color, size)
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn is_tower(&self) -> bool {
        !self.is_base && self.height > 0
    }

    pub fn is_stone(&self) -> bool {
        !self.is_base && self.height == 0
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn is_base(&self) -> bool {
        self.is_base
    }

    pub fn range(&self) -> usize {
        self.range
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    /// How far this entity can currently travel: bases and blocked towers
    /// cannot move, towers move one step, stones move up to their range.
    pub fn reach(&self) -> usize {
        if self.is_base || self.blocked {
            0
        } else if self.height > 0 {
            1
        } else {
            self.range
        }
    }

    /// Range bonus this entity grants to adjacent same-color stones.
    pub fn range_bonus(&self) -> usize {
        if self.is_tower() && !self.blocked {
            self.height as usize
        } else {
            0
        }
    }

    pub fn can_move(&self) -> bool {
        !self.destinations.is_empty()
    }
}
