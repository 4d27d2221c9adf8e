//! Move notation and the flattened board layout.
//!
//! A board of `n` boxes per side has `(n + 1) * n` horizontal edges and
//! `n * (n + 1)` vertical edges. Both are laid out in a single vector of
//! length `(n + 1) * (2n + 1)`, row by row:
//!
//! ```text
//! row r:  h[r][0] .. h[r][n-1]  filler  v[r][0] .. v[r][n]
//! ```
//!
//! The last row carries only its horizontal edges and the filler. The same
//! order is used for move enumeration, evaluator policies, and exported
//! training data, so every index computed here is part of the wire format.
//!
//! Moves are written as two letters:
//! - horizontal edge: column letter (lower case) then row letter (upper case), e.g. `bA`
//! - vertical edge: row letter (upper case) then column letter (lower case), e.g. `Ab`

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::constants::{COLUMN_MARKS, FILLER_TEXT, ROW_MARKS};

/// Length of the flattened board vector for a board of `n` boxes per side.
#[inline]
pub fn vector_len(n: usize) -> usize {
    (n + 1) * (2 * n + 1)
}

/// Number of edges on a board of `n` boxes per side.
#[inline]
pub fn edge_count(n: usize) -> usize {
    2 * n * (n + 1)
}

/// Width of one full row of the flattened vector.
#[inline]
fn stride(n: usize) -> usize {
    2 * n + 2
}

/// Which matrix an edge lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Between two dots of the same row; `(n + 1) x n` of them.
    Horizontal,
    /// Between two dots of the same column; `n x (n + 1)` of them.
    Vertical,
}

/// A single edge, addressed by matrix coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub orientation: Orientation,
    pub row: usize,
    pub col: usize,
}

impl Edge {
    pub fn horizontal(row: usize, col: usize) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            row,
            col,
        }
    }

    pub fn vertical(row: usize, col: usize) -> Self {
        Self {
            orientation: Orientation::Vertical,
            row,
            col,
        }
    }

    /// Parse a move code for a board of `n` boxes per side.
    ///
    /// Returns `None` for anything that is not exactly one lower-case and one
    /// upper-case letter of the alphabet in a valid order, or that points
    /// outside the board.
    pub fn parse(text: &str, n: usize) -> Option<Self> {
        let mut chars = text.chars();
        let (first, second) = (chars.next()?, chars.next()?);
        if chars.next().is_some() {
            return None;
        }

        if first.is_ascii_lowercase() && second.is_ascii_uppercase() {
            let col = mark_index(COLUMN_MARKS, first)?;
            let row = mark_index(ROW_MARKS, second)?;
            (row <= n && col < n).then(|| Self::horizontal(row, col))
        } else if first.is_ascii_uppercase() && second.is_ascii_lowercase() {
            let row = mark_index(ROW_MARKS, first)?;
            let col = mark_index(COLUMN_MARKS, second)?;
            (row < n && col <= n).then(|| Self::vertical(row, col))
        } else {
            None
        }
    }

    /// Two-letter move code.
    pub fn text(&self) -> String {
        let row = mark(ROW_MARKS, self.row);
        let col = mark(COLUMN_MARKS, self.col);
        match self.orientation {
            Orientation::Horizontal => format!("{col}{row}"),
            Orientation::Vertical => format!("{row}{col}"),
        }
    }

    /// Index of this edge in the flattened vector.
    #[inline]
    pub fn index(&self, n: usize) -> usize {
        match self.orientation {
            Orientation::Horizontal => self.row * stride(n) + self.col,
            Orientation::Vertical => self.row * stride(n) + n + 1 + self.col,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// What occupies one slot of the flattened vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Edge(Edge),
    /// Always-zero separator after the horizontal edges of `row`.
    Filler(usize),
}

/// Decode a flattened-vector index. Returns `None` past the end of the vector.
pub fn slot_at(n: usize, index: usize) -> Option<Slot> {
    if index >= vector_len(n) {
        return None;
    }
    let row = index / stride(n);
    let offset = index % stride(n);
    let slot = if offset < n {
        Slot::Edge(Edge::horizontal(row, offset))
    } else if offset == n {
        Slot::Filler(row)
    } else {
        Slot::Edge(Edge::vertical(row, offset - n - 1))
    };
    Some(slot)
}

/// Index of the filler slot closing the horizontal edges of `row`.
#[inline]
pub fn filler_index(n: usize, row: usize) -> usize {
    row * stride(n) + n
}

/// A move (or filler slot) as seen by the search and the evaluator.
///
/// Equality and hashing use the vector index only; the text is carried for
/// display and for replaying the move on a board.
#[derive(Debug, Clone, Eq)]
pub struct Position {
    pub text: String,
    pub index: usize,
}

impl Position {
    pub fn new(text: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            index,
        }
    }

    pub fn from_edge(edge: Edge, n: usize) -> Self {
        Self::new(edge.text(), edge.index(n))
    }

    /// The filler slot at `index`.
    pub fn filler(index: usize) -> Self {
        Self::new(FILLER_TEXT, index)
    }

    /// Whether this position names a real edge.
    pub fn is_edge(&self) -> bool {
        self.text != FILLER_TEXT
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn mark_index(marks: &str, c: char) -> Option<usize> {
    marks.chars().position(|m| m == c)
}

fn mark(marks: &str, i: usize) -> char {
    marks.chars().nth(i).unwrap_or('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_horizontal() {
        let e = Edge::parse("bC", 3).unwrap();
        assert_eq!(e, Edge::horizontal(2, 1));
        assert_eq!(e.text(), "bC");
    }

    #[test]
    fn test_parse_vertical() {
        let e = Edge::parse("Bd", 3).unwrap();
        assert_eq!(e, Edge::vertical(1, 3));
        assert_eq!(e.text(), "Bd");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "a", "aa", "AA", "aAa", "1A", "a1", "00"] {
            assert_eq!(Edge::parse(bad, 3), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        // Horizontal: rows 0..=n, columns 0..n.
        assert!(Edge::parse("aD", 3).is_some());
        assert!(Edge::parse("aE", 3).is_none());
        assert!(Edge::parse("dA", 3).is_none());
        // Vertical: rows 0..n, columns 0..=n.
        assert!(Edge::parse("Cd", 3).is_some());
        assert!(Edge::parse("Da", 3).is_none());
        assert!(Edge::parse("Ae", 3).is_none());
    }

    #[test]
    fn test_alphabet_tail_round_trips() {
        // The alphabet swaps the usual order of v..z.
        let e = Edge::horizontal(23, 22);
        assert_eq!(e.text(), "yX");
        assert_eq!(Edge::parse("yX", 25), Some(e));
    }

    #[test]
    fn test_indices_match_layout() {
        // n = 2: row stride 6, vector length 15.
        assert_eq!(vector_len(2), 15);
        assert_eq!(Edge::horizontal(0, 0).index(2), 0);
        assert_eq!(Edge::horizontal(0, 1).index(2), 1);
        assert_eq!(filler_index(2, 0), 2);
        assert_eq!(Edge::vertical(0, 0).index(2), 3);
        assert_eq!(Edge::vertical(0, 2).index(2), 5);
        assert_eq!(Edge::horizontal(1, 0).index(2), 6);
        assert_eq!(Edge::horizontal(2, 1).index(2), 13);
        assert_eq!(filler_index(2, 2), 14);
    }

    #[test]
    fn test_slot_at_inverts_index() {
        for n in 1..=5 {
            for i in 0..vector_len(n) {
                match slot_at(n, i).unwrap() {
                    Slot::Edge(e) => assert_eq!(e.index(n), i),
                    Slot::Filler(row) => assert_eq!(filler_index(n, row), i),
                }
            }
            assert_eq!(slot_at(n, vector_len(n)), None);
        }
    }

    #[test]
    fn test_position_equality_uses_index() {
        assert_eq!(Position::new("aA", 0), Position::new("zz", 0));
        assert_ne!(Position::new("aA", 0), Position::new("aA", 1));
    }
}
