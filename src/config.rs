//! Search configuration.

use serde::{Deserialize, Serialize};

use crate::agent::Seat;
use crate::constants::{
    DEFAULT_MILLIS, DEFAULT_SEED, DEFAULT_SIMULATIONS, DIRICHLET_ALPHA, DIRICHLET_EPSILON,
    EXPLORATION_PLIES, EXPLORATION_TEMPERATURE, GREEDY_TEMPERATURE, PUCT_CONSTANT, UCT_CONSTANT,
};

/// Whether the engine is producing training data or playing to win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Competitive,
    /// Noisy selection and exploratory move sampling during the opening.
    Training,
}

/// Configuration for one search engine.
///
/// Budgets are per seat so two engines of different strength can share one
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: Mode,

    /// Wall-clock budget per decision for the classic search, in milliseconds.
    pub millis: [u64; 2],

    /// Rollouts per expansion (classic) or simulations per decision (neural).
    pub simulations: [u32; 2],

    /// UCT exploration constant.
    pub uct: f64,

    /// Reward added to a node whose move kept the turn. `None` means one
    /// point per box on the board.
    pub bonus: Option<f64>,

    /// PUCT exploration constant.
    pub puct: f64,

    /// Dirichlet concentration for opening noise.
    pub dirichlet_alpha: f64,

    /// Share of the noise in the blended prior.
    pub dirichlet_epsilon: f64,

    /// Rounds, counted from the board's creation, that explore in training mode.
    pub exploration_plies: u32,

    pub exploration_temperature: f64,
    pub greedy_temperature: f64,

    /// Seed for the engine's random sources.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Competitive,
            millis: [DEFAULT_MILLIS; 2],
            simulations: [DEFAULT_SIMULATIONS; 2],
            uct: UCT_CONSTANT,
            bonus: None,
            puct: PUCT_CONSTANT,
            dirichlet_alpha: DIRICHLET_ALPHA,
            dirichlet_epsilon: DIRICHLET_EPSILON,
            exploration_plies: EXPLORATION_PLIES,
            exploration_temperature: EXPLORATION_TEMPERATURE,
            greedy_temperature: GREEDY_TEMPERATURE,
            seed: DEFAULT_SEED,
        }
    }
}

impl SearchConfig {
    /// Create config for self-play training (noise and sampling in the opening).
    pub fn for_training() -> Self {
        Self {
            mode: Mode::Training,
            ..Self::default()
        }
    }

    /// Create config for competitive play (no noise, greedy selection).
    pub fn for_competition() -> Self {
        Self::default()
    }

    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            millis: [20; 2],
            simulations: [8; 2],
            ..Self::default()
        }
    }

    /// Builder pattern: set the mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder pattern: set the same simulation count for both seats.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.simulations = [n; 2];
        self
    }

    /// Builder pattern: set the same time budget for both seats.
    pub fn with_millis(mut self, ms: u64) -> Self {
        self.millis = [ms; 2];
        self
    }

    /// Builder pattern: set the UCT constant.
    pub fn with_uct(mut self, c: f64) -> Self {
        self.uct = c;
        self
    }

    /// Builder pattern: set the keep-the-turn bonus.
    pub fn with_bonus(mut self, bonus: f64) -> Self {
        self.bonus = Some(bonus);
        self
    }

    /// Builder pattern: set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    pub fn is_training(&self) -> bool {
        self.mode == Mode::Training
    }

    pub fn millis_for(&self, seat: Seat) -> u64 {
        self.millis[seat.index()]
    }

    pub fn simulations_for(&self, seat: Seat) -> u32 {
        self.simulations[seat.index()]
    }

    /// Bonus to use on a board with `boxes` boxes.
    pub fn bonus_for(&self, boxes: u32) -> f64 {
        self.bonus.unwrap_or(f64::from(boxes))
    }

    /// Whether a board at `round` is still in the exploratory opening.
    pub fn explores(&self, round: u32) -> bool {
        self.is_training() && round <= self.exploration_plies
    }

    /// Final-move temperature for a board at `round`.
    pub fn temperature(&self, round: u32) -> f64 {
        if self.explores(round) {
            self.exploration_temperature
        } else {
            self.greedy_temperature
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.mode, Mode::Competitive);
        assert_eq!(config.simulations, [100, 100]);
        assert!((config.uct - 1.41).abs() < 1e-9);
        assert_eq!(config.seed, 435);
        assert_eq!(config.bonus_for(9), 9.0);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SearchConfig::for_training()
            .with_simulations(12)
            .with_millis(30)
            .with_bonus(0.5)
            .with_seed(1);
        assert!(config.is_training());
        assert_eq!(config.simulations_for(Seat::Two), 12);
        assert_eq!(config.millis_for(Seat::One), 30);
        assert_eq!(config.bonus_for(9), 0.5);
    }

    #[test]
    fn test_temperature_schedule() {
        let training = SearchConfig::for_training();
        assert_eq!(training.temperature(0), 1.0);
        assert_eq!(training.temperature(3), 1.0);
        assert_eq!(training.temperature(4), 0.01);

        let competitive = SearchConfig::for_competition();
        assert!(!competitive.explores(0));
        assert_eq!(competitive.temperature(0), 0.01);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"mode":"training","seed":9}"#).unwrap();
        assert!(config.is_training());
        assert_eq!(config.seed, 9);
        assert_eq!(config.simulations, [100, 100]);
    }
}
