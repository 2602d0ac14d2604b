//! # Hex Geometry
//!
//! Pure coordinate helpers for the rhombus-shaped hex board.
//!
//! Positions use axial coordinates `(column, row)`, both 1-indexed. The six
//! neighbours of a cell are reached by the offsets in [`DIRECTIONS`], which
//! keeps the cube-coordinate distance formula valid:
//!
//! ```text
//! dist(a, b) = (|dx| + |dy| + |dx + dy|) / 2
//! ```
//!
//! [`positions_at_distance`] is the single source of truth for every range and
//! neighbourhood query made by the board engine.

use std::fmt;

/// Axial direction offsets, ordered so that walking them in sequence traces a
/// closed hexagonal ring.
pub const DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),  // E
    (1, -1), // NE
    (0, -1), // NW
    (-1, 0), // W
    (-1, 1), // SW
    (0, 1),  // SE
];

/// Side of a piece, and of the turn indicator.
///
/// `White` owns the base in the `(1, 1)` corner and always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Stable index for per-color arrays.
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    pub fn both() -> [Color; 2] {
        [Color::White, Color::Black]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// A cell on the board. Equality and hashing are by coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub col: u8,
    pub row: u8,
}

impl Position {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Whether this position lies on a board of the given size.
    pub fn on_board(self, size: usize) -> bool {
        let (c, r) = (self.col as usize, self.row as usize);
        (1..=size).contains(&c) && (1..=size).contains(&r)
    }

    /// Row-major index into a `size * size` cell array.
    #[inline]
    pub fn index(self, size: usize) -> usize {
        (self.row as usize - 1) * size + (self.col as usize - 1)
    }

    /// Inverse of [`Position::index`].
    pub fn from_index(index: usize, size: usize) -> Self {
        Self::new((index % size + 1) as u8, (index / size + 1) as u8)
    }

    /// Offset this position, returning `None` when it leaves the board.
    pub fn offset(self, dc: i32, dr: i32, size: usize) -> Option<Position> {
        let c = self.col as i32 + dc;
        let r = self.row as i32 + dr;
        if c < 1 || r < 1 || c > size as i32 || r > size as i32 {
            return None;
        }
        Some(Position::new(c as u8, r as u8))
    }
}

/// Hex distance between two positions.
#[inline]
pub fn distance(a: Position, b: Position) -> usize {
    let dx = b.col as i32 - a.col as i32;
    let dy = b.row as i32 - a.row as i32;
    ((dx.abs() + dy.abs() + (dx + dy).abs()) / 2) as usize
}

/// Enumerate the ring of cells exactly `radius` steps from `center`, clipped
/// to a `size * size` board.
///
/// The walk starts `radius` steps to the south-west and follows the six ring
/// edges in [`DIRECTIONS`] order, so every cell is produced exactly once and
/// the order is deterministic.
pub fn positions_at_distance(center: Position, radius: usize, size: usize) -> Vec<Position> {
    if radius == 0 {
        return if center.on_board(size) { vec![center] } else { Vec::new() };
    }

    let r = radius as i32;
    let (sw_c, sw_r) = DIRECTIONS[4];
    let mut c = center.col as i32 + sw_c * r;
    let mut row = center.row as i32 + sw_r * r;
    let mut ring = Vec::with_capacity(6 * radius);

    for &(dc, dr) in &DIRECTIONS {
        for _ in 0..radius {
            if c >= 1 && row >= 1 && c <= size as i32 && row <= size as i32 {
                ring.push(Position::new(c as u8, row as u8));
            }
            c += dc;
            row += dr;
        }
    }
    ring
}

/// In-board neighbours of a position (the ring of radius 1).
pub fn neighbors(center: Position, size: usize) -> Vec<Position> {
    positions_at_distance(center, 1, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_distance_symmetry_and_neighbors() {
        let a = Position::new(3, 3);
        for (dc, dr) in DIRECTIONS {
            let b = a.offset(dc, dr, 8).unwrap();
            assert_eq!(distance(a, b), 1);
            assert_eq!(distance(b, a), 1);
        }
        assert_eq!(distance(Position::new(1, 1), Position::new(6, 6)), 10);
        assert_eq!(distance(Position::new(1, 6), Position::new(6, 1)), 5);
    }

    #[test]
    fn test_ring_is_exact_and_unique() {
        let size = 9;
        let center = Position::new(5, 5);
        for radius in 1..=4 {
            let ring = positions_at_distance(center, radius, size);
            assert_eq!(ring.len(), 6 * radius);
            let unique: HashSet<_> = ring.iter().copied().collect();
            assert_eq!(unique.len(), ring.len());
            assert!(ring.iter().all(|&p| distance(center, p) == radius));
        }
    }

    #[test]
    fn test_ring_is_clipped_at_corner() {
        let ring = positions_at_distance(Position::new(1, 1), 1, 6);
        let set: HashSet<_> = ring.into_iter().collect();
        let expected: HashSet<_> = [Position::new(2, 1), Position::new(1, 2)].into_iter().collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_ring_matches_brute_force() {
        let size = 7;
        for idx in 0..size * size {
            let center = Position::from_index(idx, size);
            for radius in 0..=2 * size {
                let ring: HashSet<_> =
                    positions_at_distance(center, radius, size).into_iter().collect();
                let brute: HashSet<_> = (0..size * size)
                    .map(|i| Position::from_index(i, size))
                    .filter(|&p| distance(center, p) == radius)
                    .collect();
                assert_eq!(ring, brute, "center {:?} radius {}", center, radius);
            }
        }
    }
}
