//! # Monte Carlo Tree Search
//!
//! Time-bounded UCB1 search over [`BoardState`] positions.
//!
//! ## Iteration
//! Each iteration
//! 1. descends from the root by UCB1 and expands one random unexplored move
//!    (exclusive lock on the tree, no board work),
//! 2. replays the chosen moves on a private copy of the root board,
//! 3. plays that copy out with the configured [`PlayoutPolicy`],
//! 4. adds one game, plus a win where the colors match, on the leaf and each
//!    of its ancestors (shared lock, atomic counters).
//!
//! Iterations run on a rayon pool when `parallelism > 1`. Each worker owns its
//! random generator and board copies; only the tree is shared.
//!
//! ## Tree reuse
//! [`Mcts::advance`] keeps the subtree under the move actually played so
//! statistics gathered earlier, including while pondering, carry over.

pub mod playout;
pub mod tree;
pub mod worker;

pub use playout::PlayoutPolicy;
pub use tree::FinalSelection;
pub use worker::{SearchRequest, SearchResponse, SearchWorker, WorkerError};

use crate::evaluator;
use crate::game::{BoardState, Move, Position};
use log::{debug, warn};
use parking_lot::RwLock;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tree::{Tree, ROOT};

/// Tunables of the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Wall-clock budget for one decision.
    pub time_budget: Duration,
    /// UCB1 exploration constant.
    pub exploration: f64,
    /// Worker threads. 0 uses every available core.
    pub parallelism: usize,
    pub playout: PlayoutPolicy,
    pub final_selection: FinalSelection,
    /// Playouts longer than this end without a winner.
    pub max_playout_moves: usize,
    /// Keep searching in the background while the opponent thinks.
    pub ponder: bool,
    /// Fixed seed for reproducible searches.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(1),
            exploration: std::f64::consts::SQRT_2,
            parallelism: 1,
            playout: PlayoutPolicy::Heuristic,
            final_selection: FinalSelection::Robust,
            max_playout_moves: 512,
            ponder: false,
            seed: None,
        }
    }
}

/// What one decision cost.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStatistics {
    /// Iterations completed during this decision.
    pub iterations: u64,
    /// Games recorded at the root, including reused ones.
    pub root_games: u32,
    pub tree_nodes: usize,
    pub elapsed: Duration,
}

impl SearchStatistics {
    pub fn iterations_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

/// The search engine. Owns the position it searches from.
pub struct Mcts {
    config: SearchConfig,
    board: BoardState,
    tree: RwLock<Tree>,
    /// `None` when searching on the calling thread only.
    pool: Option<ThreadPool>,
    workers: usize,
    seeds: AtomicU64,
}

impl Mcts {
    pub fn new(board: &BoardState, config: SearchConfig) -> Self {
        let workers = match config.parallelism {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = if workers > 1 {
            match ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("could not start {workers} search threads, searching serially: {e}");
                    None
                }
            }
        } else {
            None
        };
        let workers = if pool.is_some() { workers } else { 1 };
        Self {
            seeds: AtomicU64::new(config.seed.unwrap_or_else(rand::random)),
            tree: RwLock::new(Tree::from_board(board)),
            board: board.clone(),
            config,
            pool,
            workers,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Position at the root of the tree.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn tree_size(&self) -> usize {
        self.tree.read().len()
    }

    /// `(move, wins, games)` of every root child.
    pub fn root_children_stats(&self) -> Vec<(Move, u32, u32)> {
        let tree = self.tree.read();
        tree.children(ROOT)
            .filter_map(|c| c.mv.map(|mv| (mv, c.wins(), c.games())))
            .collect()
    }

    /// Discard the tree and search from `board` instead.
    pub fn reset(&mut self, board: &BoardState) {
        self.board = board.clone();
        *self.tree.get_mut() = Tree::from_board(board);
    }

    /// Play `mv` on the root position (`None` surrenders) and keep the
    /// matching subtree. Returns whether any statistics were reused.
    pub fn advance(&mut self, mv: Option<Move>) -> bool {
        self.board.apply_move(mv);
        let reused = self.tree.get_mut().promote(mv, &self.board);
        debug!(
            "advanced root by {}: {} (tree {} nodes)",
            mv.map_or_else(|| "surrender".to_string(), |m| m.to_string()),
            if reused { "subtree kept" } else { "fresh tree" },
            self.tree.get_mut().len()
        );
        reused
    }

    /// Decide a move with the configured time budget.
    pub fn search(&self) -> (Option<Move>, SearchStatistics) {
        self.search_for(self.config.time_budget)
    }

    /// Decide a move within `budget`. `None` means there is nothing to play
    /// and the side to move surrenders.
    pub fn search_for(&self, budget: Duration) -> (Option<Move>, SearchStatistics) {
        let start = Instant::now();
        let root_moves = self.root_moves();
        let enemy_base = self.board.base_position(self.board.turn().opponent());

        if let Some(choice) = forced_choice(&root_moves, enemy_base) {
            return (choice, self.statistics(0, start));
        }

        let iterations = self.run_until(start + budget);
        let decision = self.tree.read().best_move(self.config.final_selection);
        let choice = decision.or_else(|| {
            warn!("no search iteration finished within {budget:?}, using heuristic move");
            evaluator::best_move_by(&self.board, |tied| tied[0])
        });
        let stats = self.statistics(iterations, start);
        debug!(
            "search chose {:?} after {} iterations ({:.0}/s, {} nodes)",
            choice,
            stats.iterations,
            stats.iterations_per_second(),
            stats.tree_nodes
        );
        (choice, stats)
    }

    /// Grow the tree for `slice` without deciding anything. Returns the
    /// number of iterations run.
    pub fn ponder(&self, slice: Duration) -> u64 {
        if self.tree.read().root().terminal {
            return 0;
        }
        self.run_until(Instant::now() + slice)
    }

    fn root_moves(&self) -> Vec<Move> {
        let tree = self.tree.read();
        tree.children(ROOT).filter_map(|c| c.mv).collect()
    }

    fn statistics(&self, iterations: u64, start: Instant) -> SearchStatistics {
        let tree = self.tree.read();
        SearchStatistics {
            iterations,
            root_games: tree.root().games(),
            tree_nodes: tree.len(),
            elapsed: start.elapsed(),
        }
    }

    /// Run iterations on every worker until `deadline`. The deadline is only
    /// checked between iterations.
    fn run_until(&self, deadline: Instant) -> u64 {
        match &self.pool {
            Some(pool) => pool.install(|| {
                (0..self.workers)
                    .into_par_iter()
                    .map(|_| self.worker_loop(deadline))
                    .sum()
            }),
            None => self.worker_loop(deadline),
        }
    }

    fn worker_loop(&self, deadline: Instant) -> u64 {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seeds.fetch_add(1, Ordering::Relaxed));
        let mut iterations = 0;
        while Instant::now() < deadline {
            self.run_iteration(&mut rng);
            iterations += 1;
        }
        iterations
    }

    fn run_iteration(&self, rng: &mut Xoshiro256PlusPlus) {
        let selection = self
            .tree
            .write()
            .select_and_expand(self.config.exploration, rng);

        let mut board = self.board.clone();
        for mv in &selection.moves {
            board.apply_move(Some(*mv));
        }

        let leaf = selection.leaf;
        if self.tree.read().node(leaf).unexplored.is_none() {
            let decided = !board.status().is_ok();
            let moves = if decided {
                Vec::new()
            } else {
                board.all_possible_moves(board.turn())
            };
            self.tree.write().materialize(leaf, moves, decided);
        }

        let winner = playout::playout(
            &mut board,
            self.config.playout,
            self.config.max_playout_moves,
            rng,
        );
        self.tree.read().backpropagate(leaf, winner);
    }
}

/// Decision that needs no search: surrender without moves, a move onto
/// `enemy_base`, or the only move there is.
fn forced_choice(root_moves: &[Move], enemy_base: Position) -> Option<Option<Move>> {
    if let Some(win) = root_moves.iter().find(|m| m.to == enemy_base) {
        return Some(Some(*win));
    }
    match root_moves {
        [] => Some(None),
        [only] => Some(Some(*only)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Color, Position};

    fn p(col: u8, row: u8) -> Position {
        Position::new(col, row)
    }

    fn quick_config() -> SearchConfig {
        SearchConfig {
            time_budget: Duration::from_millis(50),
            seed: Some(11),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_forced_choices_skip_the_search() {
        let board = BoardState::new(8).unwrap();
        let enemy_base = board.base_position(Color::Black);
        let moves = board.all_possible_moves(Color::White);
        assert!(moves.len() > 1);

        assert_eq!(forced_choice(&moves[..1], enemy_base), Some(Some(moves[0])));
        assert_eq!(forced_choice(&[], enemy_base), Some(None));
        assert_eq!(forced_choice(&moves, enemy_base), None);

        let win = Move::new(p(8, 7), enemy_base);
        let with_win = [moves[0], win, moves[1]];
        assert_eq!(forced_choice(&with_win, enemy_base), Some(Some(win)));
    }

    #[test]
    fn test_immediate_win_is_taken() {
        let mut board = BoardState::empty(8).unwrap();
        board.place(p(8, 7), Color::White, 0, false).unwrap();
        board.place(p(3, 3), Color::White, 0, false).unwrap();
        board.place(p(4, 6), Color::Black, 0, false).unwrap();
        let mcts = Mcts::new(&board, quick_config());
        let (choice, _) = mcts.search();
        assert_eq!(choice, Some(Move::new(p(8, 7), p(8, 8))));
    }

    #[test]
    fn test_search_returns_legal_move_and_grows_tree() {
        let board = BoardState::new(8).unwrap();
        let mcts = Mcts::new(&board, quick_config());
        let (choice, stats) = mcts.search();
        let choice = choice.expect("a move");
        assert!(board.is_legal(&choice));
        assert!(stats.iterations > 0);
        assert_eq!(stats.root_games as u64, stats.iterations);
        assert!(stats.tree_nodes > board.all_possible_moves(Color::White).len());
    }

    #[test]
    fn test_advance_keeps_statistics() {
        let board = BoardState::new(8).unwrap();
        let mut mcts = Mcts::new(&board, quick_config());
        let (choice, _) = mcts.search();
        let choice = choice.unwrap();
        let explored = mcts
            .root_children_stats()
            .into_iter()
            .find(|(mv, _, _)| *mv == choice)
            .map(|(_, _, games)| games)
            .unwrap();
        assert!(explored > 0);

        assert!(mcts.advance(Some(choice)));
        assert_eq!(mcts.board().turn(), Color::Black);
        assert_eq!(mcts.tree.read().root().games(), explored);
        let replies = mcts.root_children_stats();
        assert_eq!(replies.len(), mcts.board().all_possible_moves(Color::Black).len());
    }

    #[test]
    fn test_parallel_search() {
        let board = BoardState::new(8).unwrap();
        let config = SearchConfig {
            parallelism: 4,
            playout: PlayoutPolicy::Random,
            final_selection: FinalSelection::Max,
            ..quick_config()
        };
        let mcts = Mcts::new(&board, config);
        let (choice, stats) = mcts.search();
        assert!(board.is_legal(&choice.unwrap()));
        assert_eq!(stats.root_games as u64, stats.iterations);
    }

    #[test]
    fn test_zero_budget_falls_back_to_heuristic() {
        let board = BoardState::new(8).unwrap();
        let mcts = Mcts::new(&board, quick_config());
        let (choice, stats) = mcts.search_for(Duration::ZERO);
        assert_eq!(stats.iterations, 0);
        assert_eq!(choice, evaluator::best_move_by(&board, |tied| tied[0]));
    }
}
