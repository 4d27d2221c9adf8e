//! Dots and Boxes: a Monte Carlo Tree Search engine.
//!
//! The engine plays on an `n x n` boxes grid (`1 <= n <= 25`) with either a
//! rollout-based UCT search or a PUCT search guided by an external
//! [`Evaluator`](evaluator::Evaluator), and records every decision as
//! training data augmented under the eight symmetries of the square.
//!
//! ## Modules
//!
//! - [`constants`] - Notation alphabet and engine parameters
//! - [`position`] - Edges, move text and the flattened vector layout
//! - [`board`] - Rules engine (edges, boxes, extra turns, scores)
//! - [`agent`] - Seats and agent kinds
//! - [`symmetry`] - The dihedral group acting on flattened vectors
//! - [`tree`] / [`ucb`] - Arena search tree and selection scores
//! - [`mcts`] - Classic and neural-guided search
//! - [`evaluator`] - Evaluator interface and layout adapters
//! - [`metrics`] - Move records, training examples and export sinks
//! - [`game`] - Match driver and series runner
//!
//! ## Example
//!
//! ```
//! use dots_and_boxes::agent::AgentKind;
//! use dots_and_boxes::config::SearchConfig;
//! use dots_and_boxes::evaluator::UniformEvaluator;
//! use dots_and_boxes::game::Match;
//! use dots_and_boxes::metrics::MemorySink;
//!
//! let evaluator = UniformEvaluator;
//! let mut game = Match::new(2, SearchConfig::for_testing()).unwrap();
//! game.add_agent("alice", AgentKind::Neural, Some(&evaluator)).unwrap();
//! game.add_agent("bob", AgentKind::Random, None).unwrap();
//!
//! let mut sink = MemorySink::default();
//! let status = game.play_to_end(&mut sink).unwrap();
//! println!("{status}: {}", game.board().result_summary());
//! assert_eq!(sink.games.len(), 1);
//! ```

pub mod agent;
pub mod board;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod game;
pub mod mcts;
pub mod metrics;
pub mod position;
pub mod symmetry;
pub mod tree;
pub mod ucb;

pub use error::{Error, Result};
