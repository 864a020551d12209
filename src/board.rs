//! The validated, immutable model of one level.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;

use crate::cell::CellCode;
use crate::error::LevelError;
use crate::level::Level;
use crate::location::{Coord, Location, Vertex};
use crate::step::Step;

/// The four cells logically joined by a stitch vertex.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StitchCorners {
    /// Above left of the vertex.
    pub nw: Location,
    /// Above right of the vertex.
    pub ne: Location,
    /// Below left of the vertex.
    pub sw: Location,
    /// Below right of the vertex.
    pub se: Location,
}

impl From<Vertex> for StitchCorners {
    fn from(vertex: Vertex) -> Self {
        let [nw, ne, sw, se] = vertex.corners();
        Self { nw, ne, sw, se }
    }
}

/// The path must use exactly `target` of the four grid edges meeting at `vertex`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CornerCount {
    /// The constrained vertex.
    pub vertex: Vertex,
    /// How many of its four edges the path must use, `0..=4`.
    pub target: u8,
}

/// The static, validated model of one level: base cells, stitches and corner counts.
///
/// A [`Board`] never changes after construction; the working grid with relocated movable walls
/// lives in the [`GameStateStore`](crate::GameStateStore).
#[derive(Clone, Debug)]
pub struct Board {
    pub(crate) rows: Coord,
    pub(crate) cols: Coord,
    pub(crate) base: Array2<CellCode>,
    pub(crate) stitches: Vec<Vertex>,
    pub(crate) stitch_set: HashSet<Vertex>,
    pub(crate) stitch_req: HashMap<Vertex, StitchCorners>,
    pub(crate) corner_counts: Vec<CornerCount>,
    pub(crate) total_usable: usize,
    pub(crate) base_movable_walls: usize,
}

impl TryFrom<&Level> for Board {
    type Error = LevelError;

    fn try_from(level: &Level) -> Result<Self, Self::Error> {
        let rows = level.grid.len();
        let cols = level.grid.first().map_or(0, |row| row.chars().count());
        if rows == 0 || cols == 0 {
            return Err(LevelError::Empty);
        }

        let mut codes = Vec::with_capacity(rows * cols);
        for (r, row) in level.grid.iter().enumerate() {
            let found = row.chars().count();
            if found != cols {
                return Err(LevelError::RaggedRows { row: r, expected: cols, found });
            }

            for (c, ch) in row.chars().enumerate() {
                codes.push(CellCode::try_from(ch)
                    .map_err(|code| LevelError::UnknownCellCode { code, at: Location(r, c) })?);
            }
        }

        let base = Array2::from_shape_vec((rows, cols), codes).map_err(|_| LevelError::Empty)?;

        let mut stitches = Vec::with_capacity(level.stitches.len());
        for [vr, vc] in level.stitches.iter().copied() {
            let vertex = Vertex(vr, vc);
            if !(1..rows).contains(&vr) || !(1..cols).contains(&vc) {
                return Err(LevelError::StitchOutOfBounds { vertex });
            }
            if !stitches.contains(&vertex) {
                stitches.push(vertex);
            }
        }

        let mut corner_counts = Vec::with_capacity(level.corner_counts.len());
        for [vr, vc, target] in level.corner_counts.iter().copied() {
            let vertex = Vertex(vr, vc);
            if vr > rows || vc > cols {
                return Err(LevelError::CornerOutOfBounds { vertex });
            }
            let target = match u8::try_from(target) {
                Ok(small) if small <= 4 => small,
                _ => return Err(LevelError::CornerTargetTooLarge { vertex, target }),
            };
            corner_counts.push(CornerCount { vertex, target });
        }

        Ok(Self {
            rows,
            cols,
            total_usable: base.iter().filter(|code| code.is_usable()).count(),
            base_movable_walls: base.iter().filter(|code| **code == CellCode::MovableWall).count(),
            base,
            stitch_set: stitches.iter().copied().collect(),
            stitch_req: stitches.iter().map(|v| (*v, StitchCorners::from(*v))).collect(),
            stitches,
            corner_counts,
        })
    }
}

impl Board {
    /// The board of a store that has not loaded a level yet: no cells at all.
    pub(crate) fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            base: Array2::from_elem((0, 0), CellCode::Empty),
            stitches: Vec::new(),
            stitch_set: HashSet::new(),
            stitch_req: HashMap::new(),
            corner_counts: Vec::new(),
            total_usable: 0,
            base_movable_walls: 0,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> Coord {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> Coord {
        self.cols
    }

    /// Number of cells a complete path must cover, counting movable walls as blocking.
    #[inline]
    pub fn total_usable(&self) -> usize {
        self.total_usable
    }

    #[inline]
    pub(crate) fn in_bounds(&self, location: Location) -> bool {
        location.0 < self.rows && location.1 < self.cols
    }

    /// The base code at `location`, or [`None`] out of bounds.
    pub fn base_cell(&self, location: Location) -> Option<CellCode> {
        self.base.get(location.as_index()).copied()
    }

    /// Whether a movable wall may ever stand at `location`, i.e. its base code is empty or movable wall.
    pub(crate) fn hosts_movable_wall(&self, location: Location) -> bool {
        matches!(self.base_cell(location), Some(CellCode::Empty | CellCode::MovableWall))
    }

    pub(crate) fn base_movable_wall_locations(&self) -> Vec<Location> {
        self.base.indexed_iter()
            .filter(|(_, code)| **code == CellCode::MovableWall)
            .map(|(index, _)| Location::from(index))
            .collect_vec()
    }

    /// Whether `vertex` is a stitch.
    #[inline]
    pub fn is_stitch(&self, vertex: Vertex) -> bool {
        self.stitch_set.contains(&vertex)
    }

    /// The adjacency rule shared by path growth and restore validation.
    ///
    /// Cells are adjacent if they are orthogonal neighbours, or diagonal neighbours whose shared
    /// vertex is a stitch. A stitch move tunnels through its vertex whatever occupies the other two
    /// cells there. Whether `a` and `b` themselves are usable is the caller's concern.
    pub fn adjacent(&self, a: Location, b: Location) -> bool {
        match Step::direction_to(a, b) {
            None => false,
            Some(step) if !step.is_diagonal() => true,
            Some(_) => a.shared_vertex(b).is_some_and(|vertex| self.is_stitch(vertex)),
        }
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.base.rows() {
            writeln!(f, "{}", row.iter().map(CellCode::as_char).collect::<String>())?;
        }
        Ok(())
    }
}
