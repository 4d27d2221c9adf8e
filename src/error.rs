//! Crate-level error type.

use thiserror::Error;

use crate::evaluator::EvaluatorError;

/// Errors produced while configuring the engine, searching, or exporting games.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Board size outside `1..=MAX_BOARD_SIZE`.
    #[error("unsupported board size {0}: expected 1..=25")]
    UnsupportedSize(usize),

    /// A third agent was registered on a board.
    #[error("a board holds at most two agents, cannot add {0:?}")]
    TooManyAgents(String),

    /// A search was requested before both seats were filled.
    #[error("both agents must be registered before playing")]
    MissingAgents,

    /// A neural agent was registered without an evaluator.
    #[error("agent {0:?} uses neural search but no evaluator was supplied")]
    MissingEvaluator(String),

    /// An unattended run reached a manual agent's turn.
    #[error("agent {0:?} plays manually and cannot be driven automatically")]
    ManualInput(String),

    /// Training examples can only be finalized once the game is over.
    #[error("game is not finished")]
    GameNotFinished,

    /// The evaluator failed; the search is aborted.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),

    /// The export sink failed to write.
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),

    /// The export sink failed to encode a record.
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
