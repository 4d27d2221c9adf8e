//! Constants for move notation, search parameters, and engine defaults.
//!
//! Every tunable here has a matching field in [`SearchConfig`](crate::config::SearchConfig);
//! the constants are the values a freshly built configuration starts from.

// =============================================================================
// Move Notation
// =============================================================================

/// Row letters. Upper case marks the row of an edge.
///
/// The alphabet is part of the wire format and is deliberately not in strict
/// alphabetical order after `V`.
pub const ROW_MARKS: &str = "ABCDEFGHIJKLMNOPQRSTUVYXWZ";

/// Column letters. Lower case marks the column of an edge.
pub const COLUMN_MARKS: &str = "abcdefghijklmnopqrstuvyxwz";

/// Largest supported board (boxes per side), bounded by the alphabet.
///
/// A board of `n` boxes uses `n + 1` row and column letters.
pub const MAX_BOARD_SIZE: usize = 25;

/// Text code of the filler slots in the flattened board vector.
pub const FILLER_TEXT: &str = "00";

// =============================================================================
// Board Rendering
// =============================================================================

/// A dot.
pub const DOT: &str = "o";

/// A marked horizontal edge.
pub const HORIZONTAL_MARK: &str = "---";

/// A marked vertical edge.
pub const VERTICAL_MARK: &str = "¦";

// =============================================================================
// Classic (UCT) Search Parameters
// =============================================================================

/// Default UCT exploration constant.
pub const UCT_CONSTANT: f64 = 1.41;

/// Default per-seat wall-clock budget for one decision, in milliseconds.
pub const DEFAULT_MILLIS: u64 = 5000;

/// Default per-seat number of rollouts (classic) or simulations (neural).
pub const DEFAULT_SIMULATIONS: u32 = 100;

// =============================================================================
// Neural (PUCT) Search Parameters
// =============================================================================

/// PUCT exploration constant.
pub const PUCT_CONSTANT: f64 = 1.0;

/// Dirichlet concentration for exploration noise.
pub const DIRICHLET_ALPHA: f64 = 0.41;

/// Weight of the Dirichlet noise when blended with the prior.
pub const DIRICHLET_EPSILON: f64 = 0.25;

/// Number of opening plies that use noisy selection and exploratory temperature.
pub const EXPLORATION_PLIES: u32 = 3;

/// Temperature used while exploring.
pub const EXPLORATION_TEMPERATURE: f64 = 1.0;

/// Temperature used otherwise. Anything below 1 selects greedily.
pub const GREEDY_TEMPERATURE: f64 = 0.01;

// =============================================================================
// Training Data
// =============================================================================

/// Size of the dihedral symmetry group of the square grid.
pub const SYMMETRIES: usize = 8;

/// Default seed for every random source.
pub const DEFAULT_SEED: u64 = 435;
