//! Simulation phase: play a position out to the end.

use crate::evaluator;
use crate::game::{BoardState, Color, Status};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Move choice during playouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutPolicy {
    /// Uniformly random legal moves.
    Random,
    /// Best heuristic move, ties broken at random.
    Heuristic,
}

/// Play `board` forward until the game is decided or `max_moves` moves have
/// been made. Returns the winner, or `None` when the cap was hit first.
pub fn playout<R: Rng + ?Sized>(
    board: &mut BoardState,
    policy: PlayoutPolicy,
    max_moves: usize,
    rng: &mut R,
) -> Option<Color> {
    for _ in 0..max_moves {
        match board.status() {
            Status::Win(winner) => return Some(winner),
            Status::Illegal => return None,
            Status::Ok => {}
        }
        let mv = match policy {
            PlayoutPolicy::Random => board.all_possible_moves(board.turn()).choose(rng).copied(),
            PlayoutPolicy::Heuristic => {
                evaluator::best_move_by(board, |tied| tied[rng.random_range(0..tied.len())])
            }
        };
        // No legal move means surrender, which ends the game.
        board.apply_move(mv);
    }
    board.status().winner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Position;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_playouts_finish_with_a_winner() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for policy in [PlayoutPolicy::Random, PlayoutPolicy::Heuristic] {
            let mut board = BoardState::new(6).unwrap();
            let winner = playout(&mut board, policy, 10_000, &mut rng);
            assert!(winner.is_some(), "{policy:?} playout did not finish");
            assert_eq!(board.status().winner(), winner);
        }
    }

    #[test]
    fn test_move_cap_yields_no_winner() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut board = BoardState::new(12).unwrap();
        assert_eq!(playout(&mut board, PlayoutPolicy::Random, 0, &mut rng), None);
        assert!(board.status().is_ok());
    }

    #[test]
    fn test_side_without_moves_loses() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut board = BoardState::empty(6).unwrap();
        board.place(Position::new(3, 3), Color::Black, 0, false).unwrap();
        assert_eq!(
            playout(&mut board, PlayoutPolicy::Random, 10, &mut rng),
            Some(Color::Black)
        );
    }
}
