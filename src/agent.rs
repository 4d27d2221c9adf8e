//! Players and the policies they use to pick moves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two seats at the board. Seat one always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// 1 or 2.
    #[inline]
    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }

    /// 0 or 1, for indexing per-seat arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Seat::One => 0,
            Seat::Two => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Self {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Seat::One),
            1 => Some(Seat::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent{}", self.number())
    }
}

/// How an agent chooses its moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Moves are supplied from outside (a human or another program).
    Manual,
    /// Uniformly random legal moves.
    Random,
    /// Rollout-based UCT search.
    Classic,
    /// PUCT search guided by an evaluator.
    Neural,
}

impl AgentKind {
    /// Whether this kind runs the tree search.
    pub fn searches(self) -> bool {
        matches!(self, AgentKind::Classic | AgentKind::Neural)
    }
}

/// A registered player: identity plus running score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub seat: Seat,
    pub kind: AgentKind,
    pub points: u32,
}

impl Agent {
    pub fn new(name: impl Into<String>, seat: Seat, kind: AgentKind) -> Self {
        Self {
            name: name.into(),
            seat,
            kind,
            points: 0,
        }
    }

    /// Single upper-case letter drawn inside the boxes this agent owns.
    pub fn mark(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or(match self.seat {
                Seat::One => '1',
                Seat::Two => '2',
            })
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        self.kind == AgentKind::Manual
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_other() {
        assert_eq!(Seat::One.other(), Seat::Two);
        assert_eq!(Seat::Two.other().other(), Seat::Two);
        assert_eq!(Seat::from_index(Seat::Two.index()), Some(Seat::Two));
    }

    #[test]
    fn test_mark_is_uppercase_initial() {
        let a = Agent::new("bob", Seat::One, AgentKind::Random);
        assert_eq!(a.mark(), 'B');
        let anon = Agent::new("", Seat::Two, AgentKind::Manual);
        assert_eq!(anon.mark(), '2');
        assert!(anon.is_manual());
    }

    #[test]
    fn test_only_search_kinds_search() {
        assert!(AgentKind::Classic.searches());
        assert!(AgentKind::Neural.searches());
        assert!(!AgentKind::Random.searches());
        assert!(!AgentKind::Manual.searches());
    }
}
