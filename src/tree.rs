//! Search tree with arena allocation.
//!
//! Nodes live in one `Vec` and point at each other by [`NodeId`]. Every node
//! owns its board outright; children are produced by forking the parent's
//! board and applying one move, so no two nodes ever share a board.
//!
//! Statistics per node:
//!
//! | field    | meaning                                                   |
//! |----------|-----------------------------------------------------------|
//! | `visits` | N, number of backpropagations through the node            |
//! | `score`  | W, accumulated reward (classic) or value estimate (neural)|
//! | `value`  | Q, running average of W over visits (neural only)         |
//! | `prior`  | P, probability assigned by the evaluator at expansion     |
//! | `bonus`  | reward shaping for moves that kept the turn (classic only)|

use std::fmt::Write as _;

use crate::agent::Seat;
use crate::board::Board;
use crate::position::Position;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A board snapshot with its search statistics.
#[derive(Debug, Clone)]
pub struct State {
    pub board: Board,
    /// Move that produced this board; `None` at the root.
    pub position: Option<Position>,
    pub visits: u32,
    pub score: f64,
    pub value: f64,
    pub prior: f64,
    pub bonus: f64,
}

impl State {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            position: None,
            visits: 0,
            score: 0.0,
            value: 0.0,
            prior: 1.0,
            bonus: 0.0,
        }
    }

    /// W / N, or 0 before the first visit.
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.score / f64::from(self.visits)
        }
    }

    fn dump(&self) -> String {
        let label = self.position.as_ref().map_or("Root", |p| p.text.as_str());
        format!(
            "{label}(v{}/q{:.4}/w{:.4}/p{:.4}) ",
            self.visits, self.value, self.score, self.prior
        )
    }
}

/// A vertex of the search tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub state: State,
    /// Parent node (NONE for root).
    pub parent: NodeId,
    /// Children in move-enumeration order. Empty until expanded.
    pub children: Vec<NodeId>,
    /// Noise-blended child distribution, drawn once per node.
    pub noisy_priors: Option<Vec<f64>>,
}

impl Node {
    fn new(state: State, parent: NodeId) -> Self {
        Self {
            state,
            parent,
            children: Vec::new(),
            noisy_priors: None,
        }
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.state.board
    }
}

/// Search tree rooted at one board.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn new(board: Board) -> Self {
        Self {
            nodes: vec![Node::new(State::new(board), NodeId::NONE)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// Parent of `id`, or `None` at the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id).parent;
        parent.is_some().then_some(parent)
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Add one child per legal move of `id`, each on a freshly forked board.
    ///
    /// `priors` is indexed by flattened-vector position; `None` gives every
    /// child the same prior. Children whose move kept the turn receive `bonus`.
    /// Does nothing if the node is already expanded or its board is finished.
    pub fn expand(&mut self, id: NodeId, priors: Option<&[f32]>, bonus: f64, rng: &mut fastrand::Rng) {
        let node = self.get(id);
        if node.is_expanded() || node.board().is_finished() {
            return;
        }
        let moves = node.board().empty_positions();
        let weights = normalized_priors(&moves, priors);

        let mut children = Vec::with_capacity(moves.len());
        for (position, prior) in moves.into_iter().zip(weights) {
            let parent_board = &self.get(id).state.board;
            let mover = parent_board.active_seat();
            let mut board = parent_board.fork(rng);
            board.try_play(&position.text);

            let mut state = State::new(board);
            state.prior = prior;
            if state.board.active_seat() == mover {
                state.bonus = bonus;
            }
            state.position = Some(position);
            children.push(self.allocate(Node::new(state, id)));
        }
        self.get_mut(id).children = children;
    }

    /// Nodes from `id` up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = id;
        while current.is_some() {
            path.push(current);
            current = self.get(current).parent;
        }
        path
    }

    /// Classic update: count a visit on every ancestor and, if the rollout was
    /// won by `agent`, credit `reward` plus each node's own bonus.
    pub fn backpropagate_rollout(&mut self, leaf: NodeId, winner: Option<Seat>, agent: Seat, reward: f64) {
        let won = winner == Some(agent);
        for id in self.path_to_root(leaf) {
            let state = &mut self.get_mut(id).state;
            state.visits += 1;
            if won {
                state.score += reward + state.bonus;
            }
        }
    }

    /// Neural update: fold the current W into every ancestor's running Q,
    /// then count the visit.
    pub fn backpropagate_value(&mut self, leaf: NodeId) {
        for id in self.path_to_root(leaf) {
            let state = &mut self.get_mut(id).state;
            let n = f64::from(state.visits);
            state.value = (n * state.value + state.score) / (n + 1.0);
            state.visits += 1;
        }
    }

    /// Text dump of a node and its children, optionally naming the chosen child.
    pub fn dump(&self, id: NodeId, chosen: Option<NodeId>) -> String {
        let mut out = self.get(id).state.dump();
        if let Some(chosen) = chosen {
            let _ = write!(out, "Winner: {}>> ", self.get(chosen).state.dump());
        }
        for &child in self.children(id) {
            out.push_str(&self.get(child).state.dump());
        }
        out
    }
}

/// Priors over `moves`, normalized to sum to one. Falls back to uniform when
/// no usable mass lands on a legal move.
fn normalized_priors(moves: &[Position], priors: Option<&[f32]>) -> Vec<f64> {
    let uniform = || vec![1.0 / moves.len().max(1) as f64; moves.len()];
    let Some(priors) = priors else {
        return uniform();
    };
    let raw: Vec<f64> = moves
        .iter()
        .map(|p| {
            let v = f64::from(priors.get(p.index).copied().unwrap_or(0.0));
            if v.is_finite() && v > 0.0 { v } else { 0.0 }
        })
        .collect();
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return uniform();
    }
    raw.into_iter().map(|v| v / total).collect()
}
