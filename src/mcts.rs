//! Monte Carlo Tree Search over Dots and Boxes boards.
//!
//! Two policies share one entry point, [`MonteCarloTreeSearch::find_next_move`]:
//!
//! - **Classic** (no evaluator): UCT selection, expansion of every legal
//!   move, uniformly random rollouts from a random new child, and a reward
//!   of the rollout winner's points (plus a bonus for moves that kept the
//!   turn) whenever the searching seat wins. Runs until the seat's
//!   wall-clock budget is spent; the final move has the best mean score.
//! - **Neural** (with an evaluator): a fixed number of simulations, each
//!   walking from the root to a finished board. Unexpanded nodes are
//!   evaluated once and expanded with the evaluator's priors. Selection is
//!   PUCT, or sampling from Dirichlet-blended priors during the opening of a
//!   training game. The final move is drawn from visit counts under a
//!   temperature.
//!
//! Every call builds a private tree and throws it away afterwards.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use crate::agent::Seat;
use crate::board::{Board, GameStatus};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::evaluator::{Evaluator, evaluate};
use crate::metrics::MoveRecord;
use crate::position::Position;
use crate::tree::{NodeId, Tree};
use crate::ucb::{puct_value, uct_value};

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Board after the chosen move (unchanged if there was none).
    pub board: Board,
    /// Chosen move.
    pub position: Option<Position>,
    /// Training record for the move, if one was made.
    pub record: Option<MoveRecord>,
    /// Completed iterations (classic) or simulations (neural).
    pub iterations: u32,
}

/// Search engine. Holds the configuration and private random sources.
pub struct MonteCarloTreeSearch {
    config: SearchConfig,
    /// Tie-breaking, noise and move sampling.
    rng: ChaCha20Rng,
    /// Board forks and rollouts.
    board_rng: fastrand::Rng,
}

impl MonteCarloTreeSearch {
    pub fn new(config: SearchConfig) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(config.seed);
        let board_rng = fastrand::Rng::with_seed(config.seed.wrapping_add(1));
        Self {
            config,
            rng,
            board_rng,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Board after the engine's move. Without an evaluator the classic
    /// policy is used.
    pub fn find_next_move(&mut self, board: &Board, evaluator: Option<&dyn Evaluator>) -> Result<Board> {
        Ok(self.decide(board, evaluator)?.board)
    }

    /// Search `board` and return the chosen move together with its record.
    pub fn decide(&mut self, board: &Board, evaluator: Option<&dyn Evaluator>) -> Result<Decision> {
        if board.is_finished() || board.empty_positions().is_empty() {
            return Ok(Decision {
                board: board.clone(),
                position: None,
                record: None,
                iterations: 0,
            });
        }

        let agent = board.active_seat();
        let mut tree = Tree::new(board.fork(&mut self.board_rng));
        let iterations = match evaluator {
            Some(evaluator) => self.search_neural(&mut tree, evaluator)?,
            None => self.search_classic(&mut tree, agent),
        };

        let root = tree.root();
        let temperature = self.config.temperature(board.round());
        let chosen = match evaluator {
            Some(_) => self.best_by_visits(&tree, temperature),
            None => self.best_by_score(&tree),
        };
        let Some(chosen) = chosen else {
            return Ok(Decision {
                board: board.clone(),
                position: None,
                record: None,
                iterations,
            });
        };

        let record = self.record(&tree, chosen, agent, temperature, evaluator.is_some());
        let node = tree.get(chosen);
        debug!(
            agent = %agent,
            iterations,
            root_visits = tree.get(root).state.visits,
            nodes = tree.len(),
            chosen = node.state.position.as_ref().map(|p| p.text.as_str()).unwrap_or("-"),
            "search finished"
        );
        Ok(Decision {
            board: node.state.board.clone(),
            position: node.state.position.clone(),
            record: Some(record),
            iterations,
        })
    }

    // =========================================================================
    // Classic policy
    // =========================================================================

    fn search_classic(&mut self, tree: &mut Tree, agent: Seat) -> u32 {
        let budget = Duration::from_millis(self.config.millis_for(agent));
        let start = Instant::now();
        let mut iterations = 0;
        loop {
            self.classic_iteration(tree, agent);
            iterations += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
        iterations
    }

    /// One select / expand / simulate / backpropagate pass for `agent`.
    pub fn classic_iteration(&mut self, tree: &mut Tree, agent: Seat) {
        let mut node = tree.root();
        while tree.get(node).is_expanded() {
            node = self.select_uct(tree, node);
        }

        let bonus = self.config.bonus_for(tree.get(node).board().boxes());
        tree.expand(node, None, bonus, &mut self.board_rng);

        let explore = match tree.children(node) {
            [] => node,
            children => children[self.rng.random_range(0..children.len())],
        };

        for _ in 0..self.config.simulations_for(agent).max(1) {
            let (winner, points) = self.rollout(tree.get(explore).board());
            tree.backpropagate_rollout(explore, winner, agent, f64::from(points));
        }
    }

    /// Play uniformly random moves to the end on a private fork.
    fn rollout(&mut self, board: &Board) -> (Option<Seat>, u32) {
        let mut board = board.fork(&mut self.board_rng);
        while board.random_play(&mut self.board_rng).is_some() {}
        let winner = match board.status() {
            GameStatus::Winner(seat) => Some(seat),
            _ => None,
        };
        (winner, board.end_points())
    }

    fn select_uct(&mut self, tree: &Tree, id: NodeId) -> NodeId {
        let parent_visits = tree.get(id).state.visits;
        let c = self.config.uct;
        self.argmax(tree.children(id), |child| {
            let s = &tree.get(child).state;
            uct_value(parent_visits, s.score, s.visits, c)
        })
        .unwrap_or(id)
    }

    /// Visited child with the best mean score.
    fn best_by_score(&mut self, tree: &Tree) -> Option<NodeId> {
        let visited: Vec<NodeId> = tree
            .children(tree.root())
            .iter()
            .copied()
            .filter(|&c| tree.get(c).state.visits > 0)
            .collect();
        let candidates: &[NodeId] = if visited.is_empty() {
            tree.children(tree.root())
        } else {
            &visited
        };
        self.argmax(candidates, |c| tree.get(c).state.mean_score())
    }

    // =========================================================================
    // Neural policy
    // =========================================================================

    fn search_neural(&mut self, tree: &mut Tree, evaluator: &dyn Evaluator) -> Result<u32> {
        let seat = tree.get(tree.root()).board().active_seat();
        let simulations = self.config.simulations_for(seat).max(1);
        for _ in 0..simulations {
            self.neural_simulation(tree, evaluator)?;
        }
        Ok(simulations)
    }

    /// One simulation: walk to a finished board, evaluating and expanding
    /// every unexpanded node met on the way.
    pub fn neural_simulation(&mut self, tree: &mut Tree, evaluator: &dyn Evaluator) -> Result<()> {
        let mut node = tree.root();
        loop {
            while tree.get(node).is_expanded() {
                node = self.select_neural(tree, node);
            }

            let board = tree.get(node).board();
            let value = if board.is_finished() {
                terminal_value(board)
            } else {
                let prediction = evaluate(evaluator, board)?;
                tree.expand(node, Some(&prediction.policy), 0.0, &mut self.board_rng);
                f64::from(prediction.value)
            };
            trace!(depth = tree.path_to_root(node).len(), value, "leaf evaluated");
            credit_value(tree, node, value);
            tree.backpropagate_value(node);

            if tree.get(node).board().is_finished() {
                return Ok(());
            }
        }
    }

    fn select_neural(&mut self, tree: &mut Tree, id: NodeId) -> NodeId {
        if self.config.explores(tree.get(id).board().round()) {
            self.sample_noisy(tree, id)
        } else {
            self.select_puct(tree, id)
        }
    }

    fn select_puct(&mut self, tree: &Tree, id: NodeId) -> NodeId {
        let parent_visits = tree.get(id).state.visits;
        let c = self.config.puct;
        self.argmax(tree.children(id), |child| {
            let s = &tree.get(child).state;
            puct_value(parent_visits, s.prior, s.visits, s.value, c)
        })
        .unwrap_or(id)
    }

    /// Sample a child from `(1 - eps) * P + eps * noise`, drawing the noise
    /// once per node.
    fn sample_noisy(&mut self, tree: &mut Tree, id: NodeId) -> NodeId {
        let children = tree.children(id).to_vec();
        if children.is_empty() {
            return id;
        }
        if tree.get(id).noisy_priors.is_none() {
            let eps = self.config.dirichlet_epsilon;
            let noise = dirichlet_noise(children.len(), self.config.dirichlet_alpha, &mut self.rng);
            let blended = children
                .iter()
                .zip(noise)
                .map(|(&c, eta)| (1.0 - eps) * tree.get(c).state.prior + eps * eta)
                .collect();
            tree.get_mut(id).noisy_priors = Some(blended);
        }
        let weights = tree.get(id).noisy_priors.as_deref().unwrap_or_default();
        let i = sample_index(weights, &mut self.rng).unwrap_or(children.len() - 1);
        children[i.min(children.len() - 1)]
    }

    /// Child drawn from visit counts under `temperature`. Temperatures below 1
    /// pick the most visited child.
    fn best_by_visits(&mut self, tree: &Tree, temperature: f64) -> Option<NodeId> {
        let children = tree.children(tree.root());
        if temperature < 1.0 {
            return self.argmax(children, |c| f64::from(tree.get(c).state.visits));
        }
        let weights = visit_distribution(tree, temperature);
        match sample_index(&weights, &mut self.rng) {
            Some(i) => children.get(i).copied(),
            None => self.argmax(children, |_| 0.0),
        }
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Highest-scoring id, ties broken uniformly at random.
    fn argmax(&mut self, ids: &[NodeId], mut score: impl FnMut(NodeId) -> f64) -> Option<NodeId> {
        let scores: Vec<f64> = ids.iter().map(|&id| score(id)).collect();
        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<NodeId> = ids
            .iter()
            .zip(&scores)
            .filter(|&(_, &s)| s == best)
            .map(|(&id, _)| id)
            .collect();
        match ties.len() {
            0 => ids.first().copied(),
            1 => Some(ties[0]),
            n => Some(ties[self.rng.random_range(0..n)]),
        }
    }

    fn record(&self, tree: &Tree, chosen: NodeId, agent: Seat, temperature: f64, neural: bool) -> MoveRecord {
        let root = tree.root();
        let root_board = tree.get(root).board();
        let chosen_node = tree.get(chosen);
        let chosen_board = chosen_node.board();

        let mut policy = vec![0.0f32; root_board.vector_len()];
        if temperature < 1.0 {
            if let Some(p) = &chosen_node.state.position {
                policy[p.index] = 1.0;
            }
        } else {
            for (&child, w) in tree.children(root).iter().zip(visit_distribution(tree, temperature)) {
                if let Some(p) = &tree.get(child).state.position {
                    policy[p.index] = w as f32;
                }
            }
        }

        let value_of = |id: NodeId| {
            let s = &tree.get(id).state;
            if neural { s.value } else { s.mean_score() }
        };
        let best = tree
            .children(root)
            .iter()
            .map(|&c| value_of(c))
            .fold(f64::NEG_INFINITY, f64::max);
        let value = if value_of(chosen) >= best { 1.0 } else { -1.0 };

        let position = chosen_node.state.position.as_ref().map(|p| p.text.clone()).unwrap_or_default();
        let dump = format!(
            "{}-{}|Next: {}|Pts: {}|{}\n{}",
            chosen_board.round(),
            root_board.agent_name(agent),
            chosen_board.agent_name(chosen_board.active_seat()),
            chosen_board.last_points(),
            tree.dump(root, Some(chosen)),
            chosen_board,
        );

        MoveRecord {
            agent,
            round: chosen_board.round(),
            position,
            board: root_board.to_float(),
            policy,
            value,
            dump,
        }
    }
}

/// Add a leaf's value to its parent's W.
///
/// `value` is for the player to move at `leaf`. The parent's W is read by the
/// grandparent's selection, so it is stored for the player who moved into the
/// parent: kept if that player is also to move at the leaf, negated
/// otherwise. A leaf without a parent (the root) keeps its own perspective.
fn credit_value(tree: &mut Tree, leaf: NodeId, value: f64) {
    let leaf_seat = tree.get(leaf).board().active_seat();
    let (target, chooser) = match tree.parent(leaf) {
        Some(parent) => {
            let chooser = tree
                .parent(parent)
                .map_or(tree.get(parent).board().active_seat(), |gp| tree.get(gp).board().active_seat());
            (parent, chooser)
        }
        None => (leaf, leaf_seat),
    };
    let signed = if leaf_seat == chooser { value } else { -value };
    tree.get_mut(target).state.score += signed;
}

/// Exact value of a finished board for the player to move.
fn terminal_value(board: &Board) -> f64 {
    match board.status() {
        GameStatus::Winner(seat) if seat == board.active_seat() => 1.0,
        GameStatus::Winner(_) => -1.0,
        _ => 0.0,
    }
}

/// Root children's visits raised to `1 / temperature`, normalized to one.
fn visit_distribution(tree: &Tree, temperature: f64) -> Vec<f64> {
    let children = tree.children(tree.root());
    let max = children.iter().map(|&c| tree.get(c).state.visits).max().unwrap_or(0);
    if max == 0 {
        return vec![1.0 / children.len().max(1) as f64; children.len()];
    }
    let weights: Vec<f64> = children
        .iter()
        .map(|&c| (f64::from(tree.get(c).state.visits) / f64::from(max)).powf(1.0 / temperature))
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Index drawn proportionally to `weights`; `None` if they carry no mass.
fn sample_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || !(total > 0.0) {
        return None;
    }
    pick_index(weights, rng.random::<f64>() * total)
}

/// First index whose running weight exceeds `r`. Entries without positive
/// weight are never picked; the last weighted entry absorbs rounding at the top.
fn pick_index(weights: &[f64], r: f64) -> Option<usize> {
    let mut acc = 0.0;
    let mut last = None;
    for (i, &w) in weights.iter().enumerate() {
        if !(w > 0.0) {
            continue;
        }
        acc += w;
        last = Some(i);
        if acc > r {
            return Some(i);
        }
    }
    last
}

/// Generate Dirichlet-distributed noise using Gamma variates.
fn dirichlet_noise<R: Rng + ?Sized>(n: usize, alpha: f64, rng: &mut R) -> Vec<f64> {
    use rand_distr::{Distribution, Gamma};

    let uniform = vec![1.0 / n.max(1) as f64; n];
    let Ok(gamma) = Gamma::new(alpha, 1.0) else {
        return uniform;
    };
    let samples: Vec<f64> = (0..n).map(|_| gamma.sample(rng)).collect();
    let sum: f64 = samples.iter().sum();
    if sum > 0.0 {
        samples.into_iter().map(|s| s / sum).collect()
    } else {
        uniform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::evaluator::{EvaluatorError, Prediction, UniformEvaluator};

    fn board(n: usize) -> Board {
        Board::with_rng(n, &mut fastrand::Rng::with_seed(9)).unwrap()
    }

    fn engine() -> MonteCarloTreeSearch {
        MonteCarloTreeSearch::new(SearchConfig::for_testing().with_seed(3))
    }

    #[test]
    fn test_finished_board_is_returned_unchanged() {
        let b = board(1).play("aA").play("aB").play("Aa").play("Ab");
        let d = engine().decide(&b, None).unwrap();
        assert_eq!(d.board, b);
        assert!(d.position.is_none());
        assert!(d.record.is_none());
    }

    #[test]
    fn test_one_iteration_credits_visited_child() {
        let b = board(1).play("aA").play("aB").play("Aa");
        let agent = b.active_seat();
        let mut e = MonteCarloTreeSearch::new(SearchConfig::for_testing().with_simulations(1));
        let mut tree = Tree::new(b);
        e.classic_iteration(&mut tree, agent);
        let child = tree.children(tree.root())[0];
        assert_eq!(tree.get(child).state.visits, 1);
        assert!(tree.get(child).state.score > 0.0);
    }

    #[test]
    fn test_dirichlet_noise_is_a_distribution() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let noise = dirichlet_noise(6, 0.41, &mut rng);
        assert_eq!(noise.len(), 6);
        assert!((noise.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(noise.iter().all(|&x| x >= 0.0));
        assert_eq!(dirichlet_noise(3, 0.0, &mut rng), vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_sample_index() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(sample_index(&[0.0, 1.0, 0.0], &mut rng), Some(1));
        assert_eq!(sample_index(&[0.0, 0.0], &mut rng), None);
        assert_eq!(sample_index(&[], &mut rng), None);
    }

    #[test]
    fn test_zero_weights_are_never_picked() {
        assert_eq!(pick_index(&[0.0, 0.0, 2.0, 1.0], 0.0), Some(2));
        assert_eq!(pick_index(&[0.0, 1.0, 0.0, 1.0], 1.0), Some(3));
        assert_eq!(pick_index(&[1.0, 1.0, 0.0], 2.0), Some(1));
        assert_eq!(pick_index(&[0.0, 0.0], 0.0), None);
    }

    #[test]
    fn test_terminal_value_perspective() {
        let b = board(1).play("aA").play("aB").play("Aa").play("Ab");
        // Seat two closed the box and is still to move.
        assert_eq!(terminal_value(&b), 1.0);
    }

    #[test]
    fn test_credit_flips_across_turn_change() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut tree = Tree::new(board(2));
        tree.expand(tree.root(), None, 0.0, &mut rng);
        let child = tree.children(tree.root())[0];
        tree.expand(child, None, 0.0, &mut rng);
        let grandchild = tree.children(child)[0];

        // Seat one moved into `child`; seat one is to move again at `grandchild`.
        assert_eq!(tree.get(grandchild).board().active_seat(), Seat::One);
        credit_value(&mut tree, grandchild, 0.5);
        assert_eq!(tree.get(child).state.score, 0.5);

        // At `child` seat two is to move; the root's chooser is seat one.
        credit_value(&mut tree, child, 0.5);
        assert_eq!(tree.get(tree.root()).state.score, -0.5);
    }

    #[test]
    fn test_neural_search_expands_tree() {
        let b = board(2);
        let mut e = engine();
        let d = e.decide(&b, Some(&UniformEvaluator)).unwrap();
        assert_eq!(d.iterations, 8);
        assert_eq!(d.board.turn(), 1);
        let record = d.record.unwrap();
        assert_eq!(record.board, b.to_float());
        assert_eq!(record.policy.iter().filter(|&&p| p == 1.0).count(), 1);
    }

    #[test]
    fn test_training_policy_spreads_over_children() {
        let b = board(2);
        let config = SearchConfig::for_testing().with_mode(Mode::Training).with_simulations(24);
        let mut e = MonteCarloTreeSearch::new(config);
        let record = e.decide(&b, Some(&UniformEvaluator)).unwrap().record.unwrap();
        let total: f32 = record.policy.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(record.policy.iter().filter(|&&p| p > 0.0).count() > 1);
    }

    #[test]
    fn test_evaluator_error_aborts_search() {
        let failing = |_: &[f32]| -> std::result::Result<Prediction, EvaluatorError> {
            Err(EvaluatorError::EvaluationFailed("offline".into()))
        };
        let err = engine().decide(&board(2), Some(&failing)).unwrap_err();
        assert!(matches!(err, crate::error::Error::Evaluator(_)));
    }
}
