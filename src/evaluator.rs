//! Evaluator interface for the neural-guided search.
//!
//! An evaluator maps a board vector to a policy over moves and a value
//! estimate for the player to move. The search treats it as a synchronous,
//! side-effect-free function; how it is trained or loaded is not this
//! crate's concern.
//!
//! Evaluators may speak one of two vector layouts:
//!
//! - [`Layout::Canonical`]: the board's own flattened vector, and a policy of
//!   the same length.
//! - [`Layout::ScoreEmbedded`]: all horizontal rows first, each followed by
//!   one extra field (seat one's score, seat two's score, the finished flag,
//!   then zeros), then all vertical rows. The policy lists horizontal edges
//!   then vertical edges with no fillers.
//!
//! [`evaluate`] converts both directions so the search only ever sees the
//! canonical layout.

use thiserror::Error;

use crate::agent::Seat;
use crate::board::Board;
use crate::position::{Edge, edge_count, vector_len};

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Policy has {got} entries, expected {expected}")]
    PolicyLength { expected: usize, got: usize },

    #[error("Layout {layout:?} does not support boards of size {size}")]
    UnsupportedLayout { layout: Layout, size: usize },
}

/// Result of evaluating a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Move probabilities, indexed like the evaluator's layout.
    pub policy: Vec<f32>,
    /// Expected outcome for the player to move, in `[-1, 1]`.
    pub value: f32,
}

/// Vector layout an evaluator consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Canonical,
    ScoreEmbedded,
}

impl Layout {
    /// Encode a board in this layout.
    pub fn encode(self, board: &Board) -> Result<Vec<f32>, EvaluatorError> {
        let canonical = board.to_float();
        match self {
            Layout::Canonical => Ok(canonical),
            Layout::ScoreEmbedded => {
                let n = board.size();
                if n < 2 {
                    return Err(EvaluatorError::UnsupportedLayout { layout: self, size: n });
                }
                let extras = [
                    board.score(Seat::One) as f32,
                    board.score(Seat::Two) as f32,
                    if board.is_finished() { 1.0 } else { 0.0 },
                ];
                let mut out = Vec::with_capacity(canonical.len());
                for r in 0..=n {
                    out.extend((0..n).map(|c| canonical[Edge::horizontal(r, c).index(n)]));
                    out.push(extras.get(r).copied().unwrap_or(0.0));
                }
                for r in 0..n {
                    out.extend((0..=n).map(|c| canonical[Edge::vertical(r, c).index(n)]));
                }
                Ok(out)
            }
        }
    }

    /// Number of policy entries an evaluator in this layout returns.
    pub fn policy_len(self, n: usize) -> usize {
        match self {
            Layout::Canonical => vector_len(n),
            Layout::ScoreEmbedded => edge_count(n),
        }
    }

    /// Convert a policy from this layout to the canonical layout.
    pub fn decode_policy(self, policy: &[f32], n: usize) -> Result<Vec<f32>, EvaluatorError> {
        let expected = self.policy_len(n);
        if policy.len() != expected {
            return Err(EvaluatorError::PolicyLength {
                expected,
                got: policy.len(),
            });
        }
        match self {
            Layout::Canonical => Ok(policy.to_vec()),
            Layout::ScoreEmbedded => {
                let mut out = vec![0.0; vector_len(n)];
                let verticals = (n + 1) * n;
                for r in 0..=n {
                    for c in 0..n {
                        out[Edge::horizontal(r, c).index(n)] = policy[r * n + c];
                    }
                }
                for r in 0..n {
                    for c in 0..=n {
                        out[Edge::vertical(r, c).index(n)] = policy[verticals + r * (n + 1) + c];
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Trait for board evaluators.
///
/// Implementations must be usable from several searches at once, so any
/// internal state has to be read-only.
pub trait Evaluator: Send + Sync {
    /// Evaluate one encoded board.
    fn predict(&self, input: &[f32]) -> Result<Prediction, EvaluatorError>;

    /// Layout of `input` and of the returned policy.
    fn layout(&self) -> Layout {
        Layout::Canonical
    }
}

impl<F> Evaluator for F
where
    F: Fn(&[f32]) -> Result<Prediction, EvaluatorError> + Send + Sync,
{
    fn predict(&self, input: &[f32]) -> Result<Prediction, EvaluatorError> {
        self(input)
    }
}

/// Equal probability for every slot and a neutral value.
///
/// Useful for exercising the neural search without a model; the search
/// renormalizes over legal moves anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn predict(&self, input: &[f32]) -> Result<Prediction, EvaluatorError> {
        if input.is_empty() {
            return Err(EvaluatorError::InvalidState("empty input".into()));
        }
        let p = 1.0 / input.len() as f32;
        Ok(Prediction {
            policy: vec![p; input.len()],
            value: 0.0,
        })
    }
}

/// Evaluate a board through the evaluator's layout, returning a canonical policy.
pub fn evaluate(evaluator: &dyn Evaluator, board: &Board) -> Result<Prediction, EvaluatorError> {
    let layout = evaluator.layout();
    let input = layout.encode(board)?;
    let raw = evaluator.predict(&input)?;
    let policy = layout.decode_policy(&raw.policy, board.size())?;
    Ok(Prediction {
        policy,
        value: raw.value,
    })
}
