//! # Move Evaluator
//!
//! Heuristic desirability of a single move, shared by the heuristic players
//! and by heuristic MCTS playouts.
//!
//! The base term rewards progress toward the enemy base:
//! `3 * (d(start) - d(end)) - d(end)` where `d` is the distance to that base.
//! Captures and strikes add bonuses; moves that start close to the mover's own
//! base are overridden with [`RETREAT_SCORE`], and any move onto the enemy
//! base returns [`WIN_SCORE`] ahead of everything else.

use crate::game::{distance, BoardState, Color, Move};

/// Score of a move that lands on the enemy base. Larger than any other score.
pub const WIN_SCORE: i32 = i32::MAX;
/// Override for moves starting inside the home zone.
pub const RETREAT_SCORE: i32 = -100_000;
/// Bonus per level of an adjacent enemy tower that gets captured.
pub const TOWER_CAPTURE_PER_LEVEL: i32 = 50;
/// Bonus for blocking an enemy tower from a distance.
pub const BLOCK_BONUS: i32 = 40;
/// Bonus for capturing an enemy stone.
pub const STONE_CAPTURE_BONUS: i32 = 20;

/// Radius around a player's own base whose pieces are never moved by choice.
pub fn home_zone(size: usize) -> usize {
    3.min(size / 4)
}

/// Score `mv` for `color` on `board`. Higher is better.
pub fn score(mv: &Move, color: Color, board: &BoardState) -> i32 {
    let enemy_base = board.base_position(color.opponent());
    if mv.to == enemy_base {
        return WIN_SCORE;
    }
    if distance(mv.from, board.base_position(color)) <= home_zone(board.size()) {
        return RETREAT_SCORE;
    }

    let before = distance(mv.from, enemy_base) as i32;
    let after = distance(mv.to, enemy_base) as i32;
    let mut score = 3 * (before - after) - after;

    if let Some(target) = board.entity_at(mv.to).filter(|t| t.color() != color) {
        if target.is_tower() {
            if distance(mv.from, mv.to) == 1 {
                score += TOWER_CAPTURE_PER_LEVEL * target.height() as i32;
            } else {
                score += BLOCK_BONUS;
            }
        } else {
            score += STONE_CAPTURE_BONUS;
        }
    }
    score
}

/// The best-scoring move for the side to move, ties resolved by `pick`
/// (called with the tied candidates, never empty).
pub fn best_move_by<F>(board: &BoardState, pick: F) -> Option<Move>
where
    F: FnOnce(&[Move]) -> Move,
{
    let color = board.turn();
    let mut best = Vec::new();
    let mut best_score = i32::MIN;
    for mv in board.all_possible_moves(color) {
        let s = score(&mv, color, board);
        if s > best_score {
            best_score = s;
            best.clear();
            best.push(mv);
        } else if s == best_score {
            best.push(mv);
        }
    }
    if best.is_empty() {
        None
    } else {
        Some(pick(&best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Position;

    fn p(col: u8, row: u8) -> Position {
        Position::new(col, row)
    }

    #[test]
    fn test_progress_is_rewarded() {
        let mut board = BoardState::empty(12).unwrap();
        board.place(p(6, 6), Color::White, 0, false).unwrap();
        board.place(p(11, 2), Color::Black, 0, false).unwrap();
        let forward = score(&Move::new(p(6, 6), p(7, 6)), Color::White, &board);
        let backward = score(&Move::new(p(6, 6), p(5, 6)), Color::White, &board);
        assert!(forward > backward);
    }

    #[test]
    fn test_win_beats_everything() {
        let mut board = BoardState::empty(6).unwrap();
        board.place(p(6, 5), Color::White, 0, false).unwrap();
        let mv = Move::new(p(6, 5), p(6, 6));
        assert_eq!(score(&mv, Color::White, &board), WIN_SCORE);
    }

    #[test]
    fn test_home_zone_override() {
        let mut board = BoardState::empty(12).unwrap();
        board.place(p(2, 2), Color::White, 0, false).unwrap();
        assert_eq!(home_zone(12), 3);
        let mv = Move::new(p(2, 2), p(3, 2));
        assert_eq!(score(&mv, Color::White, &board), RETREAT_SCORE);
    }

    #[test]
    fn test_capture_bonuses() {
        let mut board = BoardState::empty(12).unwrap();
        board.place(p(6, 6), Color::White, 0, false).unwrap();
        board.place(p(7, 6), Color::Black, 2, false).unwrap();
        board.place(p(6, 7), Color::Black, 0, false).unwrap();
        let tower = score(&Move::new(p(6, 6), p(7, 6)), Color::White, &board);
        let stone = score(&Move::new(p(6, 6), p(6, 7)), Color::White, &board);
        // Both end cells are equally far from the enemy base at (12,12).
        assert_eq!(tower - stone, 100 - STONE_CAPTURE_BONUS);
    }

    #[test]
    fn test_best_move_prefers_win() {
        let mut board = BoardState::empty(6).unwrap();
        board.place(p(6, 5), Color::White, 0, false).unwrap();
        board.place(p(5, 4), Color::White, 0, false).unwrap();
        let best = best_move_by(&board, |c| c[0]).unwrap();
        assert_eq!(best.to, p(6, 6));
    }
}
