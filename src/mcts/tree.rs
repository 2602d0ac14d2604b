//! Search tree stored as an arena of nodes addressed by index.
//!
//! Children hold indices and every node keeps its parent index, so walking to
//! the root is O(depth) without reference cycles. Structural changes
//! (expansion, materialization) need exclusive access to the arena; win and
//! game counters are atomics so backpropagation can run under a shared lock.

use crate::game::{BoardState, Color, Move};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

pub type NodeId = usize;

/// How the final move is picked from the root's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalSelection {
    /// Highest win ratio.
    Max,
    /// Most visits.
    Robust,
}

/// A node in the Monte Carlo search tree.
#[derive(Debug)]
pub struct Node {
    /// Move leading here from the parent; `None` for the root.
    pub(crate) mv: Option<Move>,
    /// Color that played `mv`. For the root, the color that moved last.
    pub(crate) color: Color,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Legal moves not yet turned into children. `None` until the node's
    /// position has been replayed once.
    pub(crate) unexplored: Option<Vec<Move>>,
    pub(crate) terminal: bool,
    wins: AtomicU32,
    games: AtomicU32,
}

impl Node {
    fn new(mv: Option<Move>, color: Color, parent: Option<NodeId>) -> Self {
        Self {
            mv,
            color,
            parent,
            children: Vec::new(),
            unexplored: None,
            terminal: false,
            wins: AtomicU32::new(0),
            games: AtomicU32::new(0),
        }
    }

    pub fn wins(&self) -> u32 {
        self.wins.load(Ordering::Relaxed)
    }

    pub fn games(&self) -> u32 {
        self.games.load(Ordering::Relaxed)
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.unexplored.as_ref().is_some_and(Vec::is_empty)
    }

    /// Win ratio, `None` before the first game.
    pub fn ratio(&self) -> Option<f64> {
        let games = self.games();
        (games > 0).then(|| self.wins() as f64 / games as f64)
    }

    /// UCB1 bound; unvisited nodes are always preferred.
    pub fn ucb1(&self, parent_games: u32, bias: f64) -> f64 {
        let games = self.games();
        if games == 0 {
            return f64::INFINITY;
        }
        let games = games as f64;
        self.wins() as f64 / games + bias * ((parent_games.max(1) as f64).ln() / games).sqrt()
    }
}

/// Outcome of one selection/expansion step.
#[derive(Debug, Default)]
pub struct Selection {
    /// Node the playout starts from.
    pub leaf: NodeId,
    /// Moves to replay from the root board to reach the leaf.
    pub moves: Vec<Move>,
}

pub const ROOT: NodeId = 0;

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a root for `board` with one unvisited child per legal move.
    pub fn from_board(board: &BoardState) -> Self {
        let mut tree = Tree {
            nodes: vec![Node::new(None, board.turn().opponent(), None)],
        };
        tree.materialize_root(board);
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes[id].children.iter().map(|&c| &self.nodes[c])
    }

    /// Give the root a child for every legal move it does not yet have.
    fn materialize_root(&mut self, board: &BoardState) {
        let root = &mut self.nodes[ROOT];
        if !board.status().is_ok() {
            root.terminal = true;
            root.unexplored = Some(Vec::new());
            return;
        }
        let mover = board.turn();
        let pending = match root.unexplored.take() {
            Some(moves) => moves,
            None => board.all_possible_moves(mover),
        };
        root.unexplored = Some(Vec::new());
        for mv in pending {
            self.push_child(ROOT, mv, mover);
        }
        if self.nodes[ROOT].children.is_empty() {
            self.nodes[ROOT].terminal = true;
        }
    }

    fn push_child(&mut self, parent: NodeId, mv: Move, color: Color) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(Some(mv), color, Some(parent)));
        self.nodes[parent].children.push(id);
        id
    }

    /// Descend by UCB1 through fully expanded nodes, then expand one random
    /// unexplored move. Stops early at terminal or not-yet-materialized nodes.
    pub fn select_and_expand<R: Rng + ?Sized>(&mut self, bias: f64, rng: &mut R) -> Selection {
        let mut selection = Selection::default();
        let mut id = ROOT;
        loop {
            let node = &mut self.nodes[id];
            if node.terminal {
                break;
            }
            let Some(unexplored) = node.unexplored.as_mut() else {
                break;
            };
            if !unexplored.is_empty() {
                let mv = unexplored.swap_remove(rng.random_range(0..unexplored.len()));
                let mover = node.color.opponent();
                selection.leaf = self.push_child(id, mv, mover);
                selection.moves.push(mv);
                break;
            }
            if node.children.is_empty() {
                node.terminal = true;
                break;
            }
            let child = self.select_child(id, bias, rng);
            selection.leaf = child;
            if let Some(mv) = self.nodes[child].mv {
                selection.moves.push(mv);
            }
            id = child;
        }
        selection
    }

    /// Child of `id` with the highest UCB1 bound, ties broken at random.
    pub fn select_child<R: Rng + ?Sized>(&self, id: NodeId, bias: f64, rng: &mut R) -> NodeId {
        let parent = &self.nodes[id];
        let parent_games = parent.games();
        let mut best = Vec::new();
        let mut best_bound = f64::NEG_INFINITY;
        for &child in &parent.children {
            let bound = self.nodes[child].ucb1(parent_games, bias);
            if bound > best_bound {
                best_bound = bound;
                best.clear();
                best.push(child);
            } else if bound == best_bound {
                best.push(child);
            }
        }
        match best.len() {
            0 => parent.children[0],
            1 => best[0],
            n => best[rng.random_range(0..n)],
        }
    }

    /// Record the legal moves of a leaf reached for the first time. A leaf
    /// with no moves, or a decided position, becomes terminal.
    pub fn materialize(&mut self, id: NodeId, moves: Vec<Move>, decided: bool) {
        let node = &mut self.nodes[id];
        if node.unexplored.is_some() {
            return;
        }
        node.terminal = decided || moves.is_empty();
        node.unexplored = Some(if node.terminal { Vec::new() } else { moves });
    }

    /// Count one game on `leaf` and each of its ancestors, and a win on
    /// those whose color matches `winner`.
    pub fn backpropagate(&self, leaf: NodeId, winner: Option<Color>) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = &self.nodes[id];
            node.games.fetch_add(1, Ordering::Relaxed);
            if winner == Some(node.color) {
                node.wins.fetch_add(1, Ordering::Relaxed);
            }
            current = node.parent;
        }
    }

    /// Move chosen at decision time, or `None` if no child has been played.
    pub fn best_move(&self, selection: FinalSelection) -> Option<Move> {
        let mut best: Option<&Node> = None;
        for child in self.children(ROOT).filter(|c| c.games() > 0) {
            let better = match best {
                None => true,
                Some(current) => {
                    let (ratio, games) = (child.ratio().unwrap_or(0.0), child.games());
                    let (cur_ratio, cur_games) = (current.ratio().unwrap_or(0.0), current.games());
                    match selection {
                        FinalSelection::Max => {
                            ratio > cur_ratio || (ratio == cur_ratio && games > cur_games)
                        }
                        FinalSelection::Robust => {
                            games > cur_games || (games == cur_games && ratio > cur_ratio)
                        }
                    }
                }
            };
            if better {
                best = Some(child);
            }
        }
        best.and_then(|n| n.mv)
    }

    /// Replace the tree by the subtree under the root child reached by `mv`,
    /// re-rooted on `board` (the position after `mv`). Falls back to a fresh
    /// root when no such child exists. Returns whether statistics were kept.
    pub fn promote(&mut self, mv: Option<Move>, board: &BoardState) -> bool {
        let child = mv.and_then(|mv| {
            self.nodes[ROOT]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].mv == Some(mv))
        });
        let Some(child) = child else {
            *self = Tree::from_board(board);
            return false;
        };

        let mut nodes: Vec<Node> = Vec::new();
        let mut queue = VecDeque::from([(child, None::<NodeId>)]);
        while let Some((old, new_parent)) = queue.pop_front() {
            let source = &mut self.nodes[old];
            let new_id = nodes.len();
            let mut node = Node::new(source.mv, source.color, new_parent);
            node.unexplored = source.unexplored.take();
            node.terminal = source.terminal;
            node.wins = AtomicU32::new(source.wins());
            node.games = AtomicU32::new(source.games());
            nodes.push(node);
            if let Some(parent) = new_parent {
                nodes[parent].children.push(new_id);
            }
            for &grandchild in &self.nodes[old].children {
                queue.push_back((grandchild, Some(new_id)));
            }
        }
        nodes[ROOT].mv = None;
        self.nodes = nodes;
        self.materialize_root(board);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Position;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn tree_with_stats(stats: &[(u32, u32)]) -> Tree {
        let mut tree = Tree {
            nodes: vec![Node::new(None, Color::Black, None)],
        };
        tree.nodes[ROOT].unexplored = Some(Vec::new());
        for (i, &(wins, games)) in stats.iter().enumerate() {
            let mv = Move::new(Position::new(2, 2), Position::new(3 + i as u8, 2));
            let id = tree.push_child(ROOT, mv, Color::White);
            tree.nodes[id].wins = AtomicU32::new(wins);
            tree.nodes[id].games = AtomicU32::new(games);
            tree.nodes[ROOT].games.fetch_add(games, Ordering::Relaxed);
        }
        tree
    }

    #[test]
    fn test_final_selection_strategies() {
        let tree = tree_with_stats(&[(9, 10), (1, 10)]);
        let first = tree.node(1).mv;
        assert_eq!(tree.best_move(FinalSelection::Max), first);
        // Equal visit counts: robust falls back to the win ratio.
        assert_eq!(tree.best_move(FinalSelection::Robust), first);

        let tree = tree_with_stats(&[(9, 10), (11, 20)]);
        assert_eq!(tree.best_move(FinalSelection::Max), tree.node(1).mv);
        assert_eq!(tree.best_move(FinalSelection::Robust), tree.node(2).mv);
    }

    #[test]
    fn test_ucb_prefers_unvisited_then_better() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let tree = tree_with_stats(&[(9, 10), (1, 10), (0, 0)]);
        assert_eq!(tree.select_child(ROOT, 1.4, &mut rng), 3);

        let tree = tree_with_stats(&[(9, 10), (1, 10)]);
        assert_eq!(tree.select_child(ROOT, 1.4, &mut rng), 1);
        assert!(tree.node(1).ucb1(20, 1.4) > tree.node(2).ucb1(20, 1.4));
    }

    #[test]
    fn test_no_games_means_no_decision() {
        let tree = tree_with_stats(&[(0, 0), (0, 0)]);
        assert_eq!(tree.best_move(FinalSelection::Max), None);
        assert_eq!(tree.best_move(FinalSelection::Robust), None);
    }

    #[test]
    fn test_backpropagation_credits_matching_color() {
        let tree = tree_with_stats(&[(0, 0)]);
        tree.backpropagate(1, Some(Color::White));
        tree.backpropagate(1, Some(Color::Black));
        tree.backpropagate(1, None);
        assert_eq!(tree.node(1).games(), 3);
        assert_eq!(tree.node(1).wins(), 1);
        assert_eq!(tree.root().wins(), 1);
    }

    #[test]
    fn test_expansion_materializes_one_child() {
        let board = BoardState::new(6).unwrap();
        let mut tree = Tree::from_board(&board);
        let root_children = tree.root().children.len();
        assert_eq!(root_children, board.all_possible_moves(Color::White).len());
        assert!(tree.root().is_fully_expanded());

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let first = tree.select_and_expand(1.4, &mut rng);
        assert_eq!(first.moves.len(), 1);
        assert_eq!(tree.node(first.leaf).parent, Some(ROOT));
        assert_eq!(tree.len(), 1 + root_children);

        let leaf = first.leaf;
        let mut replay = board.clone();
        for mv in &first.moves {
            replay.apply_move(Some(*mv));
        }
        let moves = replay.all_possible_moves(replay.turn());
        tree.materialize(leaf, moves, false);
        tree.backpropagate(leaf, None);

        // Once every root child has a game, descent reaches depth two.
        for _ in 1..root_children {
            let s = tree.select_and_expand(1.4, &mut rng);
            let reply = Move::new(Position::new(6, 5), Position::new(5, 5));
            tree.materialize(s.leaf, vec![reply], false);
            tree.backpropagate(s.leaf, None);
        }
        let deeper = tree.select_and_expand(1.4, &mut rng);
        assert_eq!(deeper.moves.len(), 2);
        let parent = tree.node(deeper.leaf).parent.unwrap();
        assert_eq!(tree.node(parent).parent, Some(ROOT));
    }

    #[test]
    fn test_backpropagation_walks_parents_to_root() {
        let mut tree = tree_with_stats(&[(0, 0), (0, 0)]);
        tree.nodes[1].unexplored = Some(Vec::new());
        let reply = Move::new(Position::new(5, 5), Position::new(4, 5));
        let grandchild = tree.push_child(1, reply, Color::Black);

        tree.backpropagate(grandchild, Some(Color::Black));
        tree.backpropagate(grandchild, Some(Color::White));
        assert_eq!(tree.node(grandchild).games(), 2);
        assert_eq!(tree.node(grandchild).wins(), 1);
        assert_eq!(tree.node(1).games(), 2);
        assert_eq!(tree.node(1).wins(), 1);
        assert_eq!(tree.root().games(), 2);
        assert_eq!(tree.root().wins(), 1);
        // The sibling is not on the walk.
        assert_eq!(tree.node(2).games(), 0);
    }
}
