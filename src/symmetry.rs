//! Dihedral symmetries of the dot grid, acting on the flattened board layout.
//!
//! The square grid has eight symmetries: four clockwise rotations, each
//! optionally preceded by a reflection across the horizontal axis. Rotating
//! swaps the roles of the two edge matrices; reflecting keeps them. Filler
//! slots never move, so a transformed vector is still a valid
//! board (or policy) vector of the same length.
//!
//! Elements are numbered `0..8` in the order identity, R, R², R³, F, FR,
//! FR², FR³, which is also the order augmented training examples are emitted in.

use serde::{Deserialize, Serialize};

use crate::constants::SYMMETRIES;
use crate::position::{Edge, Orientation, Slot, slot_at};

/// One element of the symmetry group: reflect (optionally), then rotate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symmetry {
    /// Quarter turns clockwise, `0..4`.
    pub rotation: u8,
    /// Reflect across the horizontal axis before rotating.
    pub reflection: bool,
}

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry {
        rotation: 0,
        reflection: false,
    };

    /// All eight elements in export order.
    pub fn all() -> [Symmetry; SYMMETRIES] {
        std::array::from_fn(Symmetry::from_index)
    }

    /// Element by export index; indices wrap modulo 8.
    pub fn from_index(i: usize) -> Self {
        Symmetry {
            rotation: (i % 4) as u8,
            reflection: (i / 4) % 2 == 1,
        }
    }

    pub fn index(&self) -> usize {
        usize::from(self.reflection) * 4 + usize::from(self.rotation % 4)
    }

    /// Uniformly drawn element.
    pub fn random<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        Symmetry::from_index(rng.random_range(0..SYMMETRIES))
    }

    /// The element undoing this one.
    pub fn inverse(&self) -> Self {
        if self.reflection {
            // Reflect-then-rotate elements are involutions.
            *self
        } else {
            Symmetry {
                rotation: (4 - self.rotation % 4) % 4,
                reflection: false,
            }
        }
    }

    /// Image of an edge on a board of `n` boxes per side.
    pub fn map_edge(&self, edge: Edge, n: usize) -> Edge {
        let mut e = edge;
        if self.reflection {
            e = match e.orientation {
                Orientation::Horizontal => Edge::horizontal(n - e.row, e.col),
                Orientation::Vertical => Edge::vertical(n - 1 - e.row, e.col),
            };
        }
        for _ in 0..self.rotation % 4 {
            e = match e.orientation {
                Orientation::Horizontal => Edge::vertical(e.col, n - e.row),
                Orientation::Vertical => Edge::horizontal(e.col, n - 1 - e.row),
            };
        }
        e
    }

    /// Transform a board or policy vector laid out for `n` boxes per side.
    ///
    /// Slots that are not edges keep their value and place.
    pub fn apply<T: Copy>(&self, values: &[T], n: usize) -> Vec<T> {
        let mut out = values.to_vec();
        for (i, &v) in values.iter().enumerate() {
            if let Some(Slot::Edge(edge)) = slot_at(n, i) {
                out[self.map_edge(edge, n).index(n)] = v;
            }
        }
        out
    }
}

/// The vector under all eight symmetries, in export order.
pub fn augment<T: Copy>(values: &[T], n: usize) -> Vec<Vec<T>> {
    Symmetry::all().iter().map(|s| s.apply(values, n)).collect()
}
