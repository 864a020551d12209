//! Steps between touching cells.

use strum::{Display, VariantArray};

use crate::location::Location;

/// A single move between two touching cells, named as a compass-like token.
///
/// Orthogonal steps are always candidates for adjacency; diagonal steps are legal only
/// through a stitch vertex shared by both cells. See [`Board::adjacent`](crate::board::Board::adjacent).
#[derive(Copy, Clone, VariantArray, Display, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum Step {
    /// Row − 1.
    #[strum(serialize = "U")]
    Up,
    /// Row + 1.
    #[strum(serialize = "D")]
    Down,
    /// Column − 1.
    #[strum(serialize = "L")]
    Left,
    /// Column + 1.
    #[strum(serialize = "R")]
    Right,
    /// Row − 1, column − 1.
    #[strum(serialize = "UL")]
    UpLeft,
    /// Row − 1, column + 1.
    #[strum(serialize = "UR")]
    UpRight,
    /// Row + 1, column − 1.
    #[strum(serialize = "DL")]
    DownLeft,
    /// Row + 1, column + 1.
    #[strum(serialize = "DR")]
    DownRight,
}

impl Step {
    /// The four steps along grid lines.
    pub const ORTHOGONAL: &'static [Self] = &[Self::Up, Self::Down, Self::Left, Self::Right];

    /// `(d_row, d_col)` of this step.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
            Self::UpLeft => (-1, -1),
            Self::UpRight => (-1, 1),
            Self::DownLeft => (1, -1),
            Self::DownRight => (1, 1),
        }
    }

    /// Attempt the step from `location` and return the resultant [`Location`], which may be out of bounds.
    pub fn attempt_from(&self, location: Location) -> Location {
        location.offset_by(self.delta())
    }

    /// The step going back.
    pub fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::UpLeft => Self::DownRight,
            Self::UpRight => Self::DownLeft,
            Self::DownLeft => Self::UpRight,
            Self::DownRight => Self::UpLeft,
        }
    }

    /// Whether this step moves both row and column.
    #[inline]
    pub fn is_diagonal(&self) -> bool {
        !Self::ORTHOGONAL.contains(self)
    }

    /// Determine the step from `a` to `b` by calling [`attempt_from`](Step::attempt_from) until one works.
    ///
    /// This considers geometry only, not walls or stitches, and returns [`None`] unless the cells touch.
    pub fn direction_to(a: Location, b: Location) -> Option<Self> {
        Self::VARIANTS.iter().find(|dir| dir.attempt_from(a) == b).copied()
    }
}
