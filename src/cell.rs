//! Cell codes and the one-character alphabet levels are written in.

use std::fmt::{Display, Formatter};

use strum::VariantArray;

/// The hint variants. A hint constrains how the path passes through its cell.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
pub enum HintKind {
    /// `t`: the path must turn here.
    Turn,
    /// `s`: the path must go straight through.
    Straight,
    /// `l`: the path must turn left.
    LeftTurn,
    /// `r`: the path must turn right.
    RightTurn,
}

/// The rock-paper-scissors variants.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray)]
pub enum RpsKind {
    /// `g`
    Rock,
    /// `c`
    Scissors,
    /// `p`
    Paper,
}

/// One cell of a level grid, as encoded by a single character of a level row.
///
/// | char | code |
/// |---|---|
/// | `.` | [`Empty`](CellCode::Empty) |
/// | `#` | [`Wall`](CellCode::Wall) |
/// | `m` | [`MovableWall`](CellCode::MovableWall) |
/// | `t` `s` `l` `r` | [`Hint`](CellCode::Hint) |
/// | `g` `c` `p` | [`Rps`](CellCode::Rps) |
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CellCode {
    /// `.`
    #[default]
    Empty,
    /// `#`, fixed for the whole level.
    Wall,
    /// `m`, may be relocated to another empty cell.
    MovableWall,
    /// A hint the path must honour where it passes.
    Hint(HintKind),
    /// A rock-paper-scissors cell.
    Rps(RpsKind),
}

impl CellCode {
    /// Walls and movable walls block the path; every other code is usable.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Wall | Self::MovableWall)
    }

    /// Whether the path may pass through this cell.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.is_blocking()
    }

    /// Whether a path cell of this code contributes a token to the constraint signature.
    #[inline]
    pub(crate) fn is_constraint(&self) -> bool {
        matches!(self, Self::Hint(_) | Self::Rps(_))
    }

    /// The level-format character for this code.
    pub fn as_char(&self) -> char {
        match self {
            Self::Empty => '.',
            Self::Wall => '#',
            Self::MovableWall => 'm',
            Self::Hint(HintKind::Turn) => 't',
            Self::Hint(HintKind::Straight) => 's',
            Self::Hint(HintKind::LeftTurn) => 'l',
            Self::Hint(HintKind::RightTurn) => 'r',
            Self::Rps(RpsKind::Rock) => 'g',
            Self::Rps(RpsKind::Scissors) => 'c',
            Self::Rps(RpsKind::Paper) => 'p',
        }
    }
}

impl TryFrom<char> for CellCode {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Ok(match value {
            '.' => Self::Empty,
            '#' => Self::Wall,
            'm' => Self::MovableWall,
            't' => Self::Hint(HintKind::Turn),
            's' => Self::Hint(HintKind::Straight),
            'l' => Self::Hint(HintKind::LeftTurn),
            'r' => Self::Hint(HintKind::RightTurn),
            'g' => Self::Rps(RpsKind::Rock),
            'c' => Self::Rps(RpsKind::Scissors),
            'p' => Self::Rps(RpsKind::Paper),
            other => return Err(other),
        })
    }
}

impl Display for CellCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
