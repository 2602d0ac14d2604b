//! Built-in [`MoveSource`] implementations.

use crate::evaluator::{self, WIN_SCORE};
use crate::game::{BoardState, Move};
use crate::mcts::{SearchConfig, SearchWorker};
use crate::player::{MoveSource, PlayerError};
use log::debug;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn seeded(seed: Option<u64>) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// Uniformly random legal moves.
pub struct RandomSource {
    rng: Xoshiro256PlusPlus,
}

impl RandomSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

impl MoveSource for RandomSource {
    fn name(&self) -> &str {
        "random"
    }

    fn next_move(&mut self, board: &BoardState) -> Result<Option<Move>, PlayerError> {
        Ok(board.all_possible_moves(board.turn()).choose(&mut self.rng).copied())
    }
}

/// Greedy single-move heuristic, ties broken at random.
pub struct HeuristicSource {
    rng: Xoshiro256PlusPlus,
}

impl HeuristicSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

impl MoveSource for HeuristicSource {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn next_move(&mut self, board: &BoardState) -> Result<Option<Move>, PlayerError> {
        let rng = &mut self.rng;
        Ok(evaluator::best_move_by(board, |tied| {
            tied[rng.random_range(0..tied.len())]
        }))
    }
}

/// Two-ply lookahead: own score minus the best opponent reply.
///
/// Works on one scratch board in undo-log mode instead of cloning per ply.
pub struct LookaheadSource {
    rng: Xoshiro256PlusPlus,
}

impl LookaheadSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }

    fn value(scratch: &mut BoardState, mv: Move) -> i64 {
        let color = scratch.turn();
        let own = evaluator::score(&mv, color, scratch);
        if own == WIN_SCORE {
            return i64::MAX;
        }
        scratch.apply_move(Some(mv));
        let opponent = color.opponent();
        let reply = scratch
            .all_possible_moves(opponent)
            .iter()
            .map(|reply| evaluator::score(reply, opponent, scratch))
            .max();
        let undone = scratch.undo_move();
        debug_assert!(undone);
        match reply {
            Some(WIN_SCORE) => i64::MIN,
            Some(reply) => own as i64 - reply as i64,
            // The opponent is left without moves.
            None => i64::MAX - 1,
        }
    }
}

impl MoveSource for LookaheadSource {
    fn name(&self) -> &str {
        "lookahead"
    }

    fn next_move(&mut self, board: &BoardState) -> Result<Option<Move>, PlayerError> {
        let mut scratch = board.clone();
        scratch.enable_undo_log();

        let mut best = Vec::new();
        let mut best_value = i64::MIN;
        for mv in board.all_possible_moves(board.turn()) {
            let value = Self::value(&mut scratch, mv);
            if value > best_value || best.is_empty() {
                best_value = value;
                best.clear();
                best.push(mv);
            } else if value == best_value {
                best.push(mv);
            }
        }
        Ok(best.choose(&mut self.rng).copied())
    }
}

/// Monte Carlo search on a background thread.
///
/// The worker's tree follows the game through [`MoveSource::observe`], so
/// statistics from earlier turns and from pondering are reused.
pub struct MctsSource {
    config: SearchConfig,
    worker: Option<SearchWorker>,
}

impl MctsSource {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }

    fn worker(&mut self, board: &BoardState) -> &SearchWorker {
        self.worker
            .get_or_insert_with(|| SearchWorker::spawn(board, self.config.clone()))
    }
}

impl MoveSource for MctsSource {
    fn name(&self) -> &str {
        "mcts"
    }

    fn reset(&mut self, board: &BoardState) -> Result<(), PlayerError> {
        match &self.worker {
            Some(worker) => worker.reset(board)?,
            None => {
                self.worker(board);
            }
        }
        Ok(())
    }

    fn next_move(&mut self, board: &BoardState) -> Result<Option<Move>, PlayerError> {
        let budget = self.config.time_budget;
        let (mv, stats) = self.worker(board).request_move(budget)?;
        debug!(
            "mcts picked {:?}: {} iterations, {} root games, {} nodes in {:?}",
            mv, stats.iterations, stats.root_games, stats.tree_nodes, stats.elapsed
        );
        Ok(mv)
    }

    fn observe(&mut self, mv: Option<Move>, board: &BoardState) -> Result<(), PlayerError> {
        match &self.worker {
            Some(worker) => worker.advance(mv)?,
            None => {
                self.worker(board);
            }
        }
        Ok(())
    }
}
