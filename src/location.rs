//! Cell and vertex coordinates.

use std::fmt::{Display, Formatter};
use std::num::NonZero;

use ndarray::Ix;
use serde::{Deserialize, Serialize};

pub(crate) type Coord = usize;
pub(crate) type Dimension = NonZero<Coord>;

/// A cell location `(row, col)` on a board. The top left cell is `Location(0, 0)`.
#[derive(Clone, Eq, Hash, Copy, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    #[inline]
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.0, self.1)
    }

    /// Offset by `(d_row, d_col)`. Stepping off the top or left edge wraps to a huge coordinate,
    /// which every bounds check treats as out of bounds.
    pub(crate) fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    /// Build a location from possibly negative coordinates, as they arrive from adapters.
    pub fn from_signed(r: i64, c: i64) -> Option<Self> {
        Some(Self(Coord::try_from(r).ok()?, Coord::try_from(c).ok()?))
    }

    /// The vertex shared by two diagonally touching cells, if they touch diagonally at all.
    pub(crate) fn shared_vertex(self, other: Self) -> Option<Vertex> {
        if self.0.abs_diff(other.0) != 1 || self.1.abs_diff(other.1) != 1 {
            return None;
        }

        Some(Vertex(self.0.max(other.0), self.1.max(other.1)))
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.0, value.1)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

/// A grid-line intersection `(vr, vc)`, i.e. the top left corner of cell `(vr, vc)`.
/// Vertex coordinates run one further than cell coordinates in each dimension.
#[derive(Clone, Eq, Hash, Copy, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct Vertex(pub Coord, pub Coord);

impl Vertex {
    /// The four cells touching this vertex, `[nw, ne, sw, se]`.
    /// Cells off the top or left edge come back wrapped and fail any bounds check.
    pub(crate) fn corners(&self) -> [Location; 4] {
        let se = Location(self.0, self.1);
        [se.offset_by((-1, -1)), se.offset_by((-1, 0)), se.offset_by((0, -1)), se]
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}
