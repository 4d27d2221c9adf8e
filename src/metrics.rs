//! Training data produced by self-play.
//!
//! Each search decision yields a [`MoveRecord`]. A game's records are kept in
//! [`GameMetrics`] until the board is full; only then is the value target
//! known, and [`GameMetrics::finalize`] expands every record into eight
//! symmetric [`TrainingExample`]s.
//!
//! Where the data goes is up to an [`ExportSink`].

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::Seat;
use crate::board::{Board, GameStatus};
use crate::error::{Error, Result};
use crate::symmetry::Symmetry;

/// What the search saw and decided for one move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Seat that made the decision.
    pub agent: Seat,
    /// Round of the board after the move.
    pub round: u32,
    /// Move chosen.
    pub position: String,
    /// Searched board, flattened.
    pub board: Vec<f32>,
    /// Visit distribution over every slot of the flattened vector.
    pub policy: Vec<f32>,
    /// Provisional value: +1 if the chosen move had the best value among its
    /// siblings, -1 otherwise. Replaced by the game outcome on export.
    pub value: f32,
    /// Human-readable search dump.
    pub dump: String,
}

/// One symmetric variant of a finalized move record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub move_index: usize,
    pub symmetry: usize,
    pub agent: Seat,
    pub board: Vec<f32>,
    pub policy: Vec<f32>,
    /// +1 if `agent` won the game, -1 if it lost, 0 on a draw.
    pub value: f32,
}

/// Move records of one game.
#[derive(Debug, Clone)]
pub struct GameMetrics {
    size: usize,
    records: Vec<MoveRecord>,
}

impl GameMetrics {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All search dumps, one per line.
    pub fn trace(&self) -> String {
        self.records.iter().map(|r| r.dump.as_str()).collect::<Vec<_>>().join("\n")
    }

    /// Fix every record's value from the final board and expand it under all
    /// eight symmetries. Fails if the board is not full.
    pub fn finalize(&self, board: &Board) -> Result<Vec<TrainingExample>> {
        let status = board.status();
        if status == GameStatus::InProgress {
            return Err(Error::GameNotFinished);
        }

        let mut examples = Vec::with_capacity(self.records.len() * Symmetry::all().len());
        for (move_index, record) in self.records.iter().enumerate() {
            let value = match status {
                GameStatus::Winner(seat) if seat == record.agent => 1.0,
                GameStatus::Winner(_) => -1.0,
                _ => 0.0,
            };
            for symmetry in Symmetry::all() {
                examples.push(TrainingExample {
                    move_index,
                    symmetry: symmetry.index(),
                    agent: record.agent,
                    board: symmetry.apply(&record.board, self.size),
                    policy: symmetry.apply(&record.policy, self.size),
                    value,
                });
            }
        }
        Ok(examples)
    }
}

/// Destination for self-play output.
pub trait ExportSink {
    /// Called once per search decision, as it happens.
    fn record_move(&mut self, record: &MoveRecord) -> Result<()>;

    /// Called once per finished game with its augmented examples and trace.
    fn finish_game(&mut self, examples: &[TrainingExample], trace: &str) -> Result<()>;
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub moves: Vec<MoveRecord>,
    pub games: Vec<Vec<TrainingExample>>,
    pub traces: Vec<String>,
}

impl ExportSink for MemorySink {
    fn record_move(&mut self, record: &MoveRecord) -> Result<()> {
        self.moves.push(record.clone());
        Ok(())
    }

    fn finish_game(&mut self, examples: &[TrainingExample], trace: &str) -> Result<()> {
        self.games.push(examples.to_vec());
        self.traces.push(trace.to_string());
        Ok(())
    }
}

/// One line of [`JsonLinesSink`] output, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExportLine {
    /// A search decision, written as it happens.
    Move(MoveRecord),
    /// A finalized, augmented example.
    Example(TrainingExample),
    /// Closes a game: its number, example count and search trace.
    Game { game: usize, examples: usize, trace: String },
}

/// Borrowed twin of [`ExportLine`] used for writing.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum Line<'a> {
    Move(&'a MoveRecord),
    Example(&'a TrainingExample),
    Game { game: usize, examples: usize, trace: &'a str },
}

/// Writes the game log as JSON, one object per line. See [`ExportLine`] for
/// the format.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    games: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, games: 0 }
    }

    /// Games written so far.
    pub fn games(&self) -> usize {
        self.games
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> ExportSink for JsonLinesSink<W> {
    fn record_move(&mut self, record: &MoveRecord) -> Result<()> {
        debug!(agent = %record.agent, round = record.round, position = %record.position, "move recorded");
        self.write_line(&Line::Move(record))
    }

    fn finish_game(&mut self, examples: &[TrainingExample], trace: &str) -> Result<()> {
        for example in examples {
            self.write_line(&Line::Example(example))?;
        }
        self.games += 1;
        self.write_line(&Line::Game {
            game: self.games,
            examples: examples.len(),
            trace,
        })?;
        self.writer.flush()?;
        debug!(game = self.games, examples = examples.len(), "game exported");
        Ok(())
    }
}
