//! Dots and Boxes rules engine.
//!
//! The board stores the two edge matrices, box ownership, scores and the
//! seat to move. All legality lives here: agents and the search only ever
//! name moves by their two-letter code and let the board decide.
//!
//! Each board also carries two shuffled pools of edge indices (one per
//! orientation) used by [`Board::random_play`]. A derived `clone` copies the
//! pools as they are; [`Board::fork`] reshuffles them so that a branch never
//! shares exhaustion state with its source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentKind, Seat};
use crate::constants::{COLUMN_MARKS, DOT, HORIZONTAL_MARK, MAX_BOARD_SIZE, ROW_MARKS, VERTICAL_MARK};
use crate::error::{Error, Result};
use crate::position::{Edge, Orientation, Position, Slot, edge_count, slot_at, vector_len};
use crate::symmetry::Symmetry;

/// Final outcome of a game, available once every edge is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Winner(Seat),
    Draw,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => f.write_str("InProgress"),
            GameStatus::Winner(seat) => write!(f, "{seat}"),
            GameStatus::Draw => f.write_str("Draw"),
        }
    }
}

/// An `n x n` boxes board.
#[derive(Debug, Clone)]
pub struct Board {
    n: usize,
    /// `(n + 1) x n`, row-major.
    horizontal: Vec<bool>,
    /// `n x (n + 1)`, row-major.
    vertical: Vec<bool>,
    /// `n x n`, row-major.
    owners: Vec<Option<Seat>>,
    active: Seat,
    /// Number of marked edges.
    turn: u32,
    /// Moves applied to this board since it was created.
    round: u32,
    scores: [u32; 2],
    agents: Vec<Agent>,
    last_move: Option<String>,
    last_points: u8,
    horizontal_pool: Vec<usize>,
    vertical_pool: Vec<usize>,
}

impl Board {
    /// Create an empty board with entropy-seeded random pools.
    pub fn new(n: usize) -> Result<Self> {
        Self::with_rng(n, &mut fastrand::Rng::new())
    }

    /// Create an empty board whose random pools are drawn from `rng`.
    pub fn with_rng(n: usize, rng: &mut fastrand::Rng) -> Result<Self> {
        if n == 0 || n > MAX_BOARD_SIZE {
            return Err(Error::UnsupportedSize(n));
        }
        let mut board = Self {
            n,
            horizontal: vec![false; (n + 1) * n],
            vertical: vec![false; n * (n + 1)],
            owners: vec![None; n * n],
            active: Seat::One,
            turn: 0,
            round: 0,
            scores: [0; 2],
            agents: Vec::with_capacity(2),
            last_move: None,
            last_points: 0,
            horizontal_pool: Vec::new(),
            vertical_pool: Vec::new(),
        };
        board.shuffle_pools(rng);
        Ok(board)
    }

    /// Register the next agent. The first agent takes seat one.
    pub fn add_agent(&mut self, name: impl Into<String>, kind: AgentKind) -> Result<Seat> {
        let name = name.into();
        let seat = Seat::from_index(self.agents.len()).ok_or_else(|| Error::TooManyAgents(name.clone()))?;
        let mut agent = Agent::new(name, seat, kind);
        agent.points = self.scores[seat.index()];
        self.agents.push(agent);
        Ok(seat)
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Boxes per side.
    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn boxes(&self) -> u32 {
        (self.n * self.n) as u32
    }

    /// Score that guarantees a win regardless of the remaining edges.
    #[inline]
    pub fn boxes_to_win(&self) -> u32 {
        self.boxes() / 2 + 1
    }

    /// Number of edges, which is also the length of a full game in moves.
    #[inline]
    pub fn max_turns(&self) -> u32 {
        edge_count(self.n) as u32
    }

    /// Length of [`Board::to_float`].
    #[inline]
    pub fn vector_len(&self) -> usize {
        vector_len(self.n)
    }

    // =========================================================================
    // Moves
    // =========================================================================

    /// Apply a move and hand the board back. Malformed, out-of-range and
    /// already-drawn moves leave the board untouched.
    pub fn play(mut self, mv: &str) -> Self {
        self.try_play(mv);
        self
    }

    /// Apply a move in place, reporting whether it was accepted.
    pub fn try_play(&mut self, mv: &str) -> bool {
        let Some(edge) = Edge::parse(mv, self.n) else {
            return false;
        };
        self.apply(edge)
    }

    fn apply(&mut self, edge: Edge) -> bool {
        if self.is_marked(edge) {
            return false;
        }
        let n = self.n;
        match edge.orientation {
            Orientation::Horizontal => self.horizontal[edge.row * n + edge.col] = true,
            Orientation::Vertical => self.vertical[edge.row * (n + 1) + edge.col] = true,
        }
        self.turn += 1;
        self.round += 1;
        self.last_move = Some(edge.text());
        self.score_boxes(edge);
        true
    }

    /// Credit every box the edge just closed to the mover, then pass the turn
    /// if nothing was closed.
    fn score_boxes(&mut self, edge: Edge) {
        let n = self.n;
        let (r, c) = (edge.row, edge.col);
        let mut neighbours = [None, None];
        match edge.orientation {
            Orientation::Horizontal => {
                if r > 0 {
                    neighbours[0] = Some((r - 1, c));
                }
                if r < n {
                    neighbours[1] = Some((r, c));
                }
            }
            Orientation::Vertical => {
                if c > 0 {
                    neighbours[0] = Some((r, c - 1));
                }
                if c < n {
                    neighbours[1] = Some((r, c));
                }
            }
        }

        let mut closed = 0u8;
        for (br, bc) in neighbours.into_iter().flatten() {
            if self.owners[br * n + bc].is_none() && self.box_complete(br, bc) {
                self.owners[br * n + bc] = Some(self.active);
                closed += 1;
            }
        }

        self.last_points = closed;
        if closed == 0 {
            self.active = self.active.other();
        } else {
            let seat = self.active.index();
            self.scores[seat] += u32::from(closed);
            if let Some(agent) = self.agents.get_mut(seat) {
                agent.points = self.scores[seat];
            }
        }
    }

    fn box_complete(&self, r: usize, c: usize) -> bool {
        let n = self.n;
        self.horizontal[r * n + c]
            && self.horizontal[(r + 1) * n + c]
            && self.vertical[r * (n + 1) + c]
            && self.vertical[r * (n + 1) + c + 1]
    }

    pub fn is_marked(&self, edge: Edge) -> bool {
        let n = self.n;
        match edge.orientation {
            Orientation::Horizontal => self.horizontal[edge.row * n + edge.col],
            Orientation::Vertical => self.vertical[edge.row * (n + 1) + edge.col],
        }
    }

    /// Owner of box `(row, col)`, if closed.
    pub fn owner(&self, row: usize, col: usize) -> Option<Seat> {
        self.owners.get(row * self.n + col).copied().flatten()
    }

    /// Play a random undrawn edge.
    ///
    /// A fair coin picks the orientation and the matching pool is popped until
    /// an undrawn edge turns up. Returns `None` once the game is over or both
    /// pools are drained.
    pub fn random_play(&mut self, rng: &mut fastrand::Rng) -> Option<Position> {
        let n = self.n;
        while !self.is_finished() {
            if self.horizontal_pool.is_empty() && self.vertical_pool.is_empty() {
                return None;
            }
            let edge = if rng.bool() {
                self.horizontal_pool.pop().map(|p| Edge::horizontal(p / n, p % n))
            } else {
                self.vertical_pool.pop().map(|p| Edge::vertical(p / (n + 1), p % (n + 1)))
            };
            if let Some(edge) = edge {
                if self.apply(edge) {
                    return Some(Position::from_edge(edge, n));
                }
            }
        }
        None
    }

    /// Copy this board with freshly shuffled random pools.
    pub fn fork(&self, rng: &mut fastrand::Rng) -> Self {
        let mut board = self.clone();
        board.shuffle_pools(rng);
        board
    }

    fn shuffle_pools(&mut self, rng: &mut fastrand::Rng) {
        let count = (self.n + 1) * self.n;
        self.horizontal_pool = (0..count).collect();
        self.vertical_pool = (0..count).collect();
        rng.shuffle(&mut self.horizontal_pool);
        rng.shuffle(&mut self.vertical_pool);
    }

    // =========================================================================
    // Enumeration and encoding
    // =========================================================================

    /// Every slot of the flattened vector, fillers included, in vector order.
    pub fn positions(&self) -> Vec<Position> {
        (0..self.vector_len())
            .map(|i| match slot_at(self.n, i) {
                Some(Slot::Edge(edge)) => Position::from_edge(edge, self.n),
                _ => Position::filler(i),
            })
            .collect()
    }

    /// Undrawn edges, in vector order.
    pub fn empty_positions(&self) -> Vec<Position> {
        (0..self.vector_len())
            .filter_map(|i| match slot_at(self.n, i) {
                Some(Slot::Edge(edge)) if !self.is_marked(edge) => Some(Position::from_edge(edge, self.n)),
                _ => None,
            })
            .collect()
    }

    /// Flattened board: 1.0 for drawn edges, 0.0 for undrawn edges and fillers.
    pub fn to_float(&self) -> Vec<f32> {
        (0..self.vector_len())
            .map(|i| match slot_at(self.n, i) {
                Some(Slot::Edge(edge)) if self.is_marked(edge) => 1.0,
                _ => 0.0,
            })
            .collect()
    }

    /// Flattened board under a uniformly drawn symmetry.
    pub fn to_random_symmetry<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        Symmetry::random(rng).apply(&self.to_float(), self.n)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// All edges drawn.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.turn == self.max_turns()
    }

    /// Some seat already holds a winning majority.
    pub fn is_finished_early(&self) -> bool {
        self.scores.iter().any(|&s| s >= self.boxes_to_win())
    }

    /// The seat not on move already holds a winning majority.
    pub fn is_lost(&self) -> bool {
        self.scores[self.active.other().index()] >= self.boxes_to_win()
    }

    #[inline]
    pub fn active_seat(&self) -> Seat {
        self.active
    }

    pub fn active_agent(&self) -> Option<&Agent> {
        self.agent(self.active)
    }

    pub fn agent(&self, seat: Seat) -> Option<&Agent> {
        self.agents.get(seat.index())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Display name for a seat, falling back to `Agent1` / `Agent2`.
    pub fn agent_name(&self, seat: Seat) -> String {
        self.agent(seat).map_or_else(|| seat.to_string(), |a| a.name.clone())
    }

    #[inline]
    pub fn score(&self, seat: Seat) -> u32 {
        self.scores[seat.index()]
    }

    /// Outcome once every edge is drawn; `InProgress` before that.
    pub fn status(&self) -> GameStatus {
        if !self.is_finished() {
            return GameStatus::InProgress;
        }
        self.leader().map_or(GameStatus::Draw, GameStatus::Winner)
    }

    /// The decided winner: whoever holds a winning majority, or the higher
    /// score once the board is full. `None` while undecided or on a draw.
    pub fn winner(&self) -> Option<Seat> {
        let target = self.boxes_to_win();
        if let Some(i) = self.scores.iter().position(|&s| s >= target) {
            return Seat::from_index(i);
        }
        match self.status() {
            GameStatus::Winner(seat) => Some(seat),
            _ => None,
        }
    }

    /// Seat currently ahead on points, finished or not.
    pub fn leader(&self) -> Option<Seat> {
        let [p1, p2] = self.scores;
        match p1.cmp(&p2) {
            std::cmp::Ordering::Greater => Some(Seat::One),
            std::cmp::Ordering::Less => Some(Seat::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Winner's points on a finished board (seat one's on a draw), else 0.
    pub fn end_points(&self) -> u32 {
        match self.status() {
            GameStatus::InProgress => 0,
            GameStatus::Winner(seat) => self.score(seat),
            GameStatus::Draw => self.score(Seat::One),
        }
    }

    pub fn last_move(&self) -> Option<&str> {
        self.last_move.as_deref()
    }

    /// Boxes closed by the last move: 0, 1 or 2.
    #[inline]
    pub fn last_points(&self) -> u8 {
        self.last_points
    }

    /// Number of drawn edges.
    #[inline]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Moves applied since the board was created.
    #[inline]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// One-line result, e.g. `Agent alice wins. alice: 5 / bob: 4.`
    pub fn result_summary(&self) -> String {
        let winner = match self.status() {
            GameStatus::InProgress => "Not Finished".to_string(),
            GameStatus::Draw => "Draw".to_string(),
            GameStatus::Winner(seat) => self.agent_name(seat),
        };
        format!(
            "Agent {winner} wins. {}: {} / {}: {}.",
            self.agent_name(Seat::One),
            self.score(Seat::One),
            self.agent_name(Seat::Two),
            self.score(Seat::Two),
        )
    }

    fn box_mark(&self, row: usize, col: usize) -> char {
        match self.owner(row, col) {
            Some(seat) => self.agent(seat).map_or(char::from(b'0' + seat.number()), Agent::mark),
            None => ' ',
        }
    }
}

/// Boards compare by game state; the random pools are ignored.
impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
            && self.horizontal == other.horizontal
            && self.vertical == other.vertical
            && self.owners == other.owners
            && self.active == other.active
            && self.turn == other.turn
            && self.round == other.round
            && self.scores == other.scores
            && self.agents == other.agents
            && self.last_move == other.last_move
            && self.last_points == other.last_points
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n;
        let rows: Vec<char> = ROW_MARKS.chars().collect();
        let cols: Vec<char> = COLUMN_MARKS.chars().collect();

        write!(f, "    ")?;
        for c in cols.iter().take(n) {
            write!(f, " {c}  ")?;
        }
        writeln!(f)?;

        for r in 0..=n {
            write!(f, "   {DOT}")?;
            for c in 0..n {
                let edge = if self.is_marked(Edge::horizontal(r, c)) { HORIZONTAL_MARK } else { "   " };
                write!(f, "{edge}{DOT}")?;
            }
            writeln!(f, " {}", rows[r])?;
            if r == n {
                break;
            }

            write!(f, " {} ", rows[r])?;
            for c in 0..=n {
                let edge = if self.is_marked(Edge::vertical(r, c)) { VERTICAL_MARK } else { " " };
                if c == n {
                    writeln!(f, "{edge}")?;
                } else {
                    write!(f, "{edge} {} ", self.box_mark(r, c))?;
                }
            }
        }

        write!(f, "  ")?;
        for c in cols.iter().take(n + 1) {
            write!(f, " {c}  ")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(n: usize) -> Board {
        Board::with_rng(n, &mut fastrand::Rng::with_seed(7)).unwrap()
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(matches!(Board::new(0), Err(Error::UnsupportedSize(0))));
        assert!(matches!(Board::new(26), Err(Error::UnsupportedSize(26))));
        assert!(Board::new(25).is_ok());
    }

    #[test]
    fn test_single_box_closes_on_fourth_edge() {
        let mut b = board(1);
        assert!(b.try_play("aA"));
        assert!(b.try_play("aB"));
        assert!(b.try_play("Aa"));
        assert_eq!(b.active_seat(), Seat::Two);
        assert!(b.try_play("Ab"));
        assert_eq!(b.last_points(), 1);
        assert_eq!(b.score(Seat::Two), 1);
        assert_eq!(b.owner(0, 0), Some(Seat::Two));
        assert_eq!(b.active_seat(), Seat::Two);
        assert!(b.is_finished());
        assert_eq!(b.status(), GameStatus::Winner(Seat::Two));
        assert_eq!(b.end_points(), 1);
    }

    #[test]
    fn test_interior_edge_can_close_two_boxes() {
        // n = 2, close the two top boxes with the shared vertical edge Ab.
        let mut b = board(2);
        for mv in ["aA", "bA", "aB", "bB", "Aa", "Ac"] {
            assert!(b.try_play(mv));
        }
        let mover = b.active_seat();
        assert!(b.try_play("Ab"));
        assert_eq!(b.last_points(), 2);
        assert_eq!(b.score(mover), 2);
        assert_eq!(b.active_seat(), mover);
    }

    #[test]
    fn test_turn_counters() {
        let b = board(2).play("aA").play("aA").play("xx");
        assert_eq!(b.turn(), 1);
        assert_eq!(b.round(), 1);
        assert_eq!(b.last_move(), Some("aA"));
    }

    #[test]
    fn test_third_agent_rejected() {
        let mut b = board(2);
        assert_eq!(b.add_agent("alice", AgentKind::Manual).unwrap(), Seat::One);
        assert_eq!(b.add_agent("bob", AgentKind::Random).unwrap(), Seat::Two);
        assert!(matches!(b.add_agent("carol", AgentKind::Manual), Err(Error::TooManyAgents(_))));
    }

    #[test]
    fn test_agent_points_follow_scores() {
        let mut b = board(1);
        b.add_agent("alice", AgentKind::Manual).unwrap();
        b.add_agent("bob", AgentKind::Manual).unwrap();
        for mv in ["aA", "aB", "Aa", "Ab"] {
            b.try_play(mv);
        }
        assert_eq!(b.agent(Seat::Two).unwrap().points, 1);
        assert_eq!(b.result_summary(), "Agent bob wins. alice: 0 / bob: 1.");
    }

    #[test]
    fn test_summary_before_finish() {
        let b = board(2);
        assert_eq!(b.result_summary(), "Agent Not Finished wins. Agent1: 0 / Agent2: 0.");
    }

    #[test]
    fn test_fork_keeps_state_and_reshuffles() {
        let mut rng = fastrand::Rng::with_seed(1);
        let b = board(4).play("aA").play("Bc");
        let forked = b.fork(&mut rng);
        assert_eq!(forked, b);
        assert_eq!(forked.to_float(), b.to_float());
    }

    #[test]
    fn test_random_play_fills_board() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut b = board(3);
        let mut played = 0;
        while b.random_play(&mut rng).is_some() {
            played += 1;
        }
        assert_eq!(played, b.max_turns());
        assert!(b.is_finished());
        assert!(b.random_play(&mut rng).is_none());
    }

    #[test]
    fn test_render_marks_owner() {
        let mut b = board(1);
        b.add_agent("zed", AgentKind::Manual).unwrap();
        b.add_agent("yan", AgentKind::Manual).unwrap();
        for mv in ["aA", "aB", "Aa", "Ab"] {
            b.try_play(mv);
        }
        let text = b.to_string();
        let expected = "     a  \n   o---o A\n A ¦ Y ¦\n   o---o B\n   a   b  \n";
        assert_eq!(text, expected);
    }
}
