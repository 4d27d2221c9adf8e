//! Confidence-bound scores used during selection.
//!
//! - UCT (classic search): `W/N + c * sqrt(ln(N_parent) / N)`
//! - PUCT (neural search): `Q + c * P * sqrt(N_parent) / (1 + N)`

/// UCT score of a child. Unvisited children score `f64::INFINITY` so they are
/// always tried first.
#[inline]
pub fn uct_value(parent_visits: u32, child_score: f64, child_visits: u32, c: f64) -> f64 {
    if child_visits == 0 {
        return f64::INFINITY;
    }
    let n = f64::from(child_visits);
    child_score / n + c * (f64::from(parent_visits).ln() / n).sqrt()
}

/// PUCT score of a child. `child_value` is already in the chooser's perspective.
#[inline]
pub fn puct_value(parent_visits: u32, child_prior: f64, child_visits: u32, child_value: f64, c: f64) -> f64 {
    child_value + c * child_prior * f64::from(parent_visits).sqrt() / (1.0 + f64::from(child_visits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uct_unvisited_child() {
        assert_eq!(uct_value(10, 0.0, 0, 1.41), f64::INFINITY);
    }

    #[test]
    fn test_uct_visited_child() {
        // 6/3 + 1.41 * sqrt(ln(9)/3)
        let expected = 2.0 + 1.41 * (9f64.ln() / 3.0).sqrt();
        assert!((uct_value(9, 6.0, 3, 1.41) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uct_prefers_less_visited_at_equal_mean() {
        assert!(uct_value(20, 2.0, 2, 1.41) > uct_value(20, 8.0, 8, 1.41));
    }

    #[test]
    fn test_puct_unvisited_child() {
        // sqrt(100) * 0.5 / 1 = 5.0
        assert!((puct_value(100, 0.5, 0, 0.0, 1.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_puct_value_term() {
        let score = puct_value(0, 0.9, 4, -0.25, 1.0);
        assert!((score + 0.25).abs() < 1e-12);
    }
}
