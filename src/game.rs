//! Driving games between two agents.
//!
//! A [`Match`] owns one board, one search engine and the move records of the
//! game in progress. [`run_series`] plays repeated matches and tallies the
//! results.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::agent::{AgentKind, Seat};
use crate::board::{Board, GameStatus};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::mcts::MonteCarloTreeSearch;
use crate::metrics::{ExportSink, GameMetrics};

/// What happened on one call to [`Match::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// A move was applied.
    Played(String),
    /// A manual move was invalid or already drawn; the board is unchanged.
    Rejected(String),
    /// The active agent is manual and no move was supplied.
    NeedsInput(Seat),
    /// The board is full.
    Finished,
}

/// One game between two registered agents.
pub struct Match<'e> {
    board: Board,
    engine: MonteCarloTreeSearch,
    evaluators: [Option<&'e dyn Evaluator>; 2],
    metrics: GameMetrics,
    rng: fastrand::Rng,
    exported: bool,
}

impl<'e> Match<'e> {
    pub fn new(n: usize, config: SearchConfig) -> Result<Self> {
        let mut rng = fastrand::Rng::with_seed(config.seed.wrapping_add(2));
        let board = Board::with_rng(n, &mut rng)?;
        Ok(Self {
            board,
            engine: MonteCarloTreeSearch::new(config),
            evaluators: [None, None],
            metrics: GameMetrics::new(n),
            rng,
            exported: false,
        })
    }

    /// Register the next agent. Neural agents need an evaluator.
    pub fn add_agent(
        &mut self,
        name: impl Into<String>,
        kind: AgentKind,
        evaluator: Option<&'e dyn Evaluator>,
    ) -> Result<Seat> {
        let name = name.into();
        if kind == AgentKind::Neural && evaluator.is_none() {
            return Err(Error::MissingEvaluator(name));
        }
        let seat = self.board.add_agent(name, kind)?;
        self.evaluators[seat.index()] = evaluator;
        Ok(seat)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn metrics(&self) -> &GameMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SearchConfig {
        self.engine.config()
    }

    /// Advance one turn. `manual` is only read when the active agent is manual.
    pub fn step(&mut self, manual: Option<&str>, sink: &mut dyn ExportSink) -> Result<Turn> {
        if self.board.is_finished() {
            return Ok(Turn::Finished);
        }
        let seat = self.board.active_seat();
        let kind = self.board.agent(seat).map(|a| a.kind).ok_or(Error::MissingAgents)?;
        if self.board.agents().len() < 2 {
            return Err(Error::MissingAgents);
        }

        if kind.searches() {
            return self.search_turn(seat, kind, sink);
        }
        match kind {
            AgentKind::Manual => {
                let Some(text) = manual else {
                    return Ok(Turn::NeedsInput(seat));
                };
                if self.board.try_play(text) {
                    Ok(Turn::Played(text.to_string()))
                } else {
                    warn!(agent = %self.board.agent_name(seat), text, "move rejected");
                    Ok(Turn::Rejected(text.to_string()))
                }
            }
            _ => Ok(match self.board.random_play(&mut self.rng) {
                Some(position) => Turn::Played(position.text),
                None => Turn::Finished,
            }),
        }
    }

    /// Let the engine move for `seat`; neural agents search with their evaluator.
    fn search_turn(&mut self, seat: Seat, kind: AgentKind, sink: &mut dyn ExportSink) -> Result<Turn> {
        let evaluator = match kind {
            AgentKind::Neural => self.evaluators[seat.index()],
            _ => None,
        };
        let decision = self.engine.decide(&self.board, evaluator)?;
        if let Some(record) = decision.record {
            sink.record_move(&record)?;
            self.metrics.push(record);
        }
        self.board = decision.board;
        Ok(match decision.position {
            Some(position) => Turn::Played(position.text),
            None => Turn::Finished,
        })
    }

    /// Step until the board is full, then hand the finalized examples and
    /// trace to `sink`. Fails if a manual agent comes up.
    pub fn play_to_end(&mut self, sink: &mut dyn ExportSink) -> Result<GameStatus> {
        loop {
            match self.step(None, sink)? {
                Turn::Finished => break,
                Turn::NeedsInput(seat) => return Err(Error::ManualInput(self.board.agent_name(seat))),
                Turn::Played(_) | Turn::Rejected(_) => {}
            }
        }
        self.finish(sink)
    }

    /// Export the game once its board is full. Later calls only report the
    /// status.
    pub fn finish(&mut self, sink: &mut dyn ExportSink) -> Result<GameStatus> {
        let examples = self.metrics.finalize(&self.board)?;
        if !self.exported {
            sink.finish_game(&examples, &self.metrics.trace())?;
            self.exported = true;
            info!(
                moves = self.board.turn(),
                records = self.metrics.len(),
                "{}",
                self.board.result_summary()
            );
        }
        Ok(self.board.status())
    }
}

/// One seat's agent for a series.
#[derive(Clone, Copy)]
pub struct AgentSpec<'e> {
    pub name: &'e str,
    pub kind: AgentKind,
    pub evaluator: Option<&'e dyn Evaluator>,
}

impl<'e> AgentSpec<'e> {
    pub fn new(name: &'e str, kind: AgentKind) -> Self {
        Self {
            name,
            kind,
            evaluator: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: &'e dyn Evaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }
}

/// Tally of a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesSummary {
    pub games: u32,
    pub seat_one_wins: u32,
    pub seat_two_wins: u32,
    pub draws: u32,
}

impl SeriesSummary {
    fn tally(&mut self, status: GameStatus) {
        self.games += 1;
        match status {
            GameStatus::Winner(Seat::One) => self.seat_one_wins += 1,
            GameStatus::Winner(Seat::Two) => self.seat_two_wins += 1,
            GameStatus::Draw | GameStatus::InProgress => self.draws += 1,
        }
    }

    /// Settings and results as a short text block.
    pub fn report(&self, n: usize, config: &SearchConfig, agents: [AgentSpec<'_>; 2]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Games: {}", self.games);
        let _ = writeln!(out, "Boxes: {n}");
        let _ = writeln!(out, "Mode: {:?}", config.mode);
        for seat in [Seat::One, Seat::Two] {
            let i = seat.index();
            let _ = writeln!(out, "MCTS time P{}: {} ms", seat.number(), config.millis[i]);
            let _ = writeln!(out, "Simulations P{}: {}", seat.number(), config.simulations[i]);
        }
        let _ = writeln!(out, "Uct: {}", config.uct);
        let _ = writeln!(out, "Bonus: {}", config.bonus_for((n * n) as u32));
        out.push_str("---------------------------\n");
        let [a, b] = agents;
        let _ = writeln!(out, "Agent 1 {}/{:?}: {} wins", a.name, a.kind, self.seat_one_wins);
        let _ = writeln!(out, "Agent 2 {}/{:?}: {} wins", b.name, b.kind, self.seat_two_wins);
        let _ = writeln!(out, "Draws   : {}", self.draws);
        out.push_str("---------------------------\n");
        out
    }
}

/// Play `games` unattended games of size `n`. Game `i` searches with seed
/// `config.seed + i`.
pub fn run_series(
    games: u32,
    n: usize,
    config: &SearchConfig,
    agents: [AgentSpec<'_>; 2],
    sink: &mut dyn ExportSink,
) -> Result<SeriesSummary> {
    let mut summary = SeriesSummary::default();
    for game in 0..games {
        let seeded = config.clone().with_seed(config.seed.wrapping_add(u64::from(game)));
        let mut m = Match::new(n, seeded)?;
        for spec in agents {
            m.add_agent(spec.name, spec.kind, spec.evaluator)?;
        }
        let status = m.play_to_end(sink)?;
        summary.tally(status);
        info!(game = game + 1, %status, "game finished");
    }
    info!(
        games = summary.games,
        seat_one = summary.seat_one_wins,
        seat_two = summary.seat_two_wins,
        draws = summary.draws,
        "series finished"
    );
    Ok(summary)
}
