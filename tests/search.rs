//! Integration tests for the classic and neural searches.

use std::time::{Duration, Instant};

use dots_and_boxes::agent::Seat;
use dots_and_boxes::board::{Board, GameStatus};
use dots_and_boxes::config::{Mode, SearchConfig};
use dots_and_boxes::evaluator::{EvaluatorError, Prediction, UniformEvaluator};
use dots_and_boxes::mcts::MonteCarloTreeSearch;
use dots_and_boxes::tree::{NodeId, Tree};

// =============================================================================
// Helper functions
// =============================================================================

fn empty(n: usize) -> Board {
    Board::with_rng(n, &mut fastrand::Rng::with_seed(17)).unwrap()
}

fn play_all(board: Board, moves: &[&str]) -> Board {
    moves.iter().fold(board, |b, mv| b.play(mv))
}

fn engine(config: SearchConfig) -> MonteCarloTreeSearch {
    MonteCarloTreeSearch::new(config)
}

/// Constant value, equal priors.
fn constant(value: f32) -> impl Fn(&[f32]) -> Result<Prediction, EvaluatorError> + Send + Sync {
    move |input: &[f32]| {
        Ok(Prediction {
            policy: vec![1.0; input.len()],
            value,
        })
    }
}

fn visited_child(tree: &Tree) -> NodeId {
    tree.children(tree.root())
        .iter()
        .copied()
        .max_by_key(|&c| tree.get(c).state.visits)
        .unwrap()
}

// =============================================================================
// Classic search
// =============================================================================

#[test]
fn test_classic_takes_the_only_move() {
    let board = play_all(empty(1), &["aA", "aB", "Aa"]);
    let next = engine(SearchConfig::for_testing()).find_next_move(&board, None).unwrap();
    assert_eq!(next.last_move(), Some("Ab"));
    assert!(next.is_finished());
    assert_eq!(next.status(), GameStatus::Winner(Seat::Two));
}

#[test]
fn test_classic_completes_an_open_box() {
    // Seat one to move with box (0, 0) one edge short.
    let board = play_all(empty(3), &["aA", "Aa", "aB", "cD"]);
    assert_eq!(board.active_seat(), Seat::One);
    let config = SearchConfig::for_testing().with_millis(300).with_simulations(4);
    let next = engine(config).find_next_move(&board, None).unwrap();
    assert_eq!(next.last_move(), Some("Ab"));
    assert_eq!(next.score(Seat::One), 1);
}

#[test]
fn test_one_winning_update_credits_the_child() {
    let board = play_all(empty(1), &["aA", "aB", "Aa"]);
    let agent = board.active_seat();
    let mut tree = Tree::new(board);
    let mut search = engine(SearchConfig::for_testing().with_simulations(1));
    search.classic_iteration(&mut tree, agent);

    let child = tree.children(tree.root())[0];
    assert_eq!(tree.get(child).state.visits, 1);
    assert!(tree.get(child).state.score > 0.0);
    assert_eq!(tree.get(tree.root()).state.visits, 1);
}

#[test]
fn test_finished_board_is_unchanged() {
    let board = play_all(empty(1), &["aA", "aB", "Aa", "Ab"]);
    let mut search = engine(SearchConfig::for_testing());
    assert_eq!(search.find_next_move(&board, None).unwrap(), board);
    assert_eq!(search.find_next_move(&board, Some(&UniformEvaluator)).unwrap(), board);
}

#[test]
fn test_classic_record() {
    let board = empty(2);
    let decision = engine(SearchConfig::for_testing()).decide(&board, None).unwrap();
    assert!(decision.iterations >= 1);
    let record = decision.record.unwrap();
    assert_eq!(record.agent, Seat::One);
    assert_eq!(record.board, board.to_float());
    assert_eq!(record.policy.len(), board.vector_len());
    assert_eq!(record.policy.iter().sum::<f32>(), 1.0);
    assert!(record.value == 1.0 || record.value == -1.0);
    assert!(record.dump.starts_with("1-Agent1|Next: Agent2|Pts: 0|Root("));
}

#[test]
fn test_classic_spends_each_seats_own_budget() {
    let mut config = SearchConfig::for_testing().with_seed(5);
    config.millis = [10, 60];
    let mut search = engine(config);

    for (board, seat, budget) in [(empty(4), Seat::One, 10), (empty(4).play("aA"), Seat::Two, 60)] {
        assert_eq!(board.active_seat(), seat);
        let start = Instant::now();
        let decision = search.decide(&board, None).unwrap();
        let elapsed = start.elapsed();
        assert!(decision.iterations >= 1);
        assert!(
            elapsed >= Duration::from_millis(budget),
            "{seat} stopped after {elapsed:?} of {budget}ms"
        );
        assert!(decision.position.is_some());
    }
}

#[test]
fn test_classic_runs_once_without_budget() {
    let decision = engine(SearchConfig::for_testing().with_millis(0)).decide(&empty(3), None).unwrap();
    assert_eq!(decision.iterations, 1);
    assert!(decision.position.is_some());
}

// =============================================================================
// Neural search
// =============================================================================

#[test]
fn test_two_box_moves_keep_the_movers_perspective() {
    // Only the two middle horizontal edges are left; each closes two boxes.
    let board = play_all(empty(2), &["aA", "bA", "Aa", "Ab", "Ac", "Ba", "Bb", "Bc", "aC", "bC"]);
    assert_eq!(board.active_seat(), Seat::One);

    let evaluator = constant(0.25);
    let mut tree = Tree::new(board);
    let mut search = engine(SearchConfig::for_testing());
    search.neural_simulation(&mut tree, &evaluator).unwrap();

    // Seat one closes two boxes, keeps the turn, closes the other two and wins.
    let child = visited_child(&tree);
    let state = &tree.get(child).state;
    assert_eq!(tree.get(child).board().active_seat(), Seat::One);
    assert_eq!(state.visits, 2);
    assert_eq!(state.score, 1.0);
    assert_eq!(state.value, 0.5);
    // Root: its own estimate plus the child's, both for seat one.
    assert_eq!(tree.get(tree.root()).state.score, 0.5);
}

#[test]
fn test_non_scoring_moves_flip_the_perspective() {
    // Seat one must open the last box for seat two.
    let board = play_all(empty(1), &["aA", "aB"]);
    assert_eq!(board.active_seat(), Seat::One);

    let evaluator = constant(0.25);
    let mut tree = Tree::new(board);
    let mut search = engine(SearchConfig::for_testing());
    search.neural_simulation(&mut tree, &evaluator).unwrap();

    let child = visited_child(&tree);
    assert_eq!(tree.get(child).board().active_seat(), Seat::Two);
    assert_eq!(tree.get(child).state.score, -1.0);
    assert_eq!(tree.get(tree.root()).state.score, 0.25 - 0.25);
}

#[test]
fn test_neural_search_is_deterministic_per_seed() {
    let board = play_all(empty(3), &["aA", "Bc"]);
    let config = SearchConfig::for_testing().with_mode(Mode::Training).with_simulations(16).with_seed(99);
    let evaluator = UniformEvaluator;
    let a = engine(config.clone()).decide(&board, Some(&evaluator)).unwrap();
    let b = engine(config).decide(&board, Some(&evaluator)).unwrap();
    assert_eq!(a.position, b.position);
    assert_eq!(a.record.unwrap().policy, b.record.unwrap().policy);
}

#[test]
fn test_neural_plays_legal_moves_to_the_end() {
    let mut board = empty(2);
    let mut search = engine(SearchConfig::for_testing().with_mode(Mode::Training));
    let evaluator = UniformEvaluator;
    while !board.is_finished() {
        let turn = board.turn();
        board = search.find_next_move(&board, Some(&evaluator)).unwrap();
        assert_eq!(board.turn(), turn + 1);
    }
    assert_eq!(board.score(Seat::One) + board.score(Seat::Two), 4);
}

#[test]
fn test_wrong_policy_length_aborts() {
    let short = |_: &[f32]| -> Result<Prediction, EvaluatorError> {
        Ok(Prediction {
            policy: vec![1.0; 3],
            value: 0.0,
        })
    };
    let result = engine(SearchConfig::for_testing()).decide(&empty(2), Some(&short));
    assert!(result.is_err());
}
