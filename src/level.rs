//! Level data as supplied by a level source, and ways of supplying it.

use std::collections::VecDeque;
use std::num::NonZero;

use itertools::Itertools;
use ndarray::{Array2, AssignElem};
use serde::{Deserialize, Serialize};

use crate::cell::CellCode;
use crate::config::LEVEL_CACHE_CAPACITY;
use crate::location::{Dimension, Location, Vertex};

/// A level exactly as a level source hands it over.
///
/// `grid` holds one string per row over the [`CellCode`] alphabet.
/// Nothing here is trusted until it passes through [`Board::try_from`](crate::board::Board).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// One string per row.
    pub grid: Vec<String>,
    /// Stitch vertices as `[vr, vc]`.
    #[serde(default)]
    pub stitches: Vec<[usize; 2]>,
    /// Corner-count constraints as `[vr, vc, target]`.
    #[serde(default)]
    pub corner_counts: Vec<[usize; 3]>,
}

impl Level {
    /// A level with no stitches or corner counts. Rows are kept verbatim; unknown characters
    /// and ragged rows are rejected later, when the level is turned into a board.
    pub fn from_rows(rows: &[&str]) -> Self {
        Self {
            grid: rows.iter().map(|row| row.to_string()).collect_vec(),
            ..Default::default()
        }
    }

    /// Add stitches at the given `(vr, vc)` vertices.
    pub fn with_stitches(mut self, stitches: &[(usize, usize)]) -> Self {
        self.stitches.extend(stitches.iter().map(|(vr, vc)| [*vr, *vc]));
        self
    }

    /// Add `(vr, vc, target)` corner-count constraints.
    pub fn with_corner_counts(mut self, corner_counts: &[(usize, usize, usize)]) -> Self {
        self.corner_counts.extend(corner_counts.iter().map(|(vr, vc, target)| [*vr, *vc, *target]));
        self
    }
}

/// Anything that can produce the level at an index.
///
/// Implemented for closures `FnMut(usize) -> Option<Level>`, for [`LevelPack`] and for [`CachedLevelSource`].
pub trait LevelSource {
    /// The level at `index`, or [`None`] if there is none.
    fn level(&mut self, index: usize) -> Option<Level>;
}

impl<F> LevelSource for F
where
    F: FnMut(usize) -> Option<Level>,
{
    fn level(&mut self, index: usize) -> Option<Level> {
        self(index)
    }
}

/// A fixed, ordered list of levels.
#[derive(Clone, Debug, Default)]
pub struct LevelPack(pub Vec<Level>);

impl LevelSource for LevelPack {
    fn level(&mut self, index: usize) -> Option<Level> {
        self.0.get(index).cloned()
    }
}

/// Wraps a level generator, keeping the most recently used levels.
///
/// Once `capacity` levels are held, a miss evicts the least recently used one.
/// Indices the generator has no level for are not cached.
pub struct CachedLevelSource<F> {
    generate: F,
    capacity: usize,
    // least recently used first
    entries: VecDeque<(usize, Level)>,
}

impl<F> CachedLevelSource<F>
where
    F: FnMut(usize) -> Option<Level>,
{
    /// Cache up to [`LEVEL_CACHE_CAPACITY`] levels from `generate`.
    pub fn new(generate: F) -> Self {
        Self::with_capacity(generate, LEVEL_CACHE_CAPACITY)
    }

    /// Cache up to `capacity` levels, at least one.
    pub fn with_capacity(generate: F, capacity: usize) -> Self {
        Self {
            generate,
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Indices currently cached, least recently used first.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|(index, _)| *index).collect_vec()
    }
}

impl<F> LevelSource for CachedLevelSource<F>
where
    F: FnMut(usize) -> Option<Level>,
{
    fn level(&mut self, index: usize) -> Option<Level> {
        if let Some(position) = self.entries.iter().position(|(cached, _)| *cached == index) {
            let entry = self.entries.remove(position)?;
            let level = entry.1.clone();
            self.entries.push_back(entry);
            return Some(level);
        }

        let level = (self.generate)(index)?;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((index, level.clone()));
        Some(level)
    }
}

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuilderInvalidReason {
    /// A cell, stitch or corner-count constraint was placed outside the grid.
    FeatureOutOfBounds,
    /// A corner-count target above 4 was requested.
    CornerTargetTooLarge,
}

/// Builds [`Level`]s programmatically, one feature at a time.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// Once a builder is invalid, every further call does nothing.
#[derive(Clone)]
pub struct LevelBuilder {
    // rows, cols
    dims: (Dimension, Dimension),
    cells: Array2<CellCode>,
    stitches: Vec<Vertex>,
    corner_counts: Vec<(Vertex, u8)>,
    invalid_reasons: Vec<BuilderInvalidReason>,
}

impl Default for LevelBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::<usize>::MIN.saturating_add(4), NonZero::<usize>::MIN.saturating_add(4)))
    }
}

impl LevelBuilder {
    /// Construct a new empty level with the specified dimensions, specified in `(rows, cols)` order.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            cells: Array2::from_elem((dims.0.get(), dims.1.get()), CellCode::Empty),
            stitches: Default::default(),
            corner_counts: Default::default(),
            invalid_reasons: Default::default(),
        }
    }

    #[inline]
    fn in_bounds(&self, location: Location) -> bool {
        location.0 < self.dims.0.get() && location.1 < self.dims.1.get()
    }

    fn invalidate(&mut self, reason: BuilderInvalidReason) -> &mut Self {
        self.invalid_reasons.push(reason);
        self
    }

    /// Place `code` at `location`, replacing whatever was there.
    pub fn set_cell(&mut self, location: Location, code: CellCode) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !self.in_bounds(location) {
            return self.invalidate(BuilderInvalidReason::FeatureOutOfBounds);
        }

        if let Some(cell) = self.cells.get_mut(location.as_index()) {
            cell.assign_elem(code);
        }
        self
    }

    /// Place a fixed wall.
    pub fn add_wall(&mut self, location: Location) -> &mut Self {
        self.set_cell(location, CellCode::Wall)
    }

    /// Place a movable wall.
    pub fn add_movable_wall(&mut self, location: Location) -> &mut Self {
        self.set_cell(location, CellCode::MovableWall)
    }

    /// Add a stitch at `vertex`, which must be interior so that all four touching cells exist.
    pub fn add_stitch(&mut self, vertex: Vertex) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !(1..self.dims.0.get()).contains(&vertex.0) || !(1..self.dims.1.get()).contains(&vertex.1) {
            return self.invalidate(BuilderInvalidReason::FeatureOutOfBounds);
        }

        if !self.stitches.contains(&vertex) {
            self.stitches.push(vertex);
        }
        self
    }

    /// Require the path to use exactly `target` of the four grid edges meeting at `vertex`.
    pub fn add_corner_count(&mut self, vertex: Vertex, target: u8) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if vertex.0 > self.dims.0.get() || vertex.1 > self.dims.1.get() {
            return self.invalidate(BuilderInvalidReason::FeatureOutOfBounds);
        }

        if target > 4 {
            return self.invalidate(BuilderInvalidReason::CornerTargetTooLarge);
        }

        self.corner_counts.push((vertex, target));
        self
    }

    /// Check the validity of this builder.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Convert the state of this builder into a [`Level`].
    pub fn build(&self) -> Result<Level, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        Ok(Level {
            grid: self.cells.rows()
                .into_iter()
                .map(|row| row.iter().map(CellCode::as_char).collect::<String>())
                .collect_vec(),
            stitches: self.stitches.iter().map(|v| [v.0, v.1]).collect_vec(),
            corner_counts: self.corner_counts.iter()
                .map(|(v, target)| [v.0, v.1, usize::from(*target)])
                .collect_vec(),
        })
    }
}
