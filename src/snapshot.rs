//! Read-only views of the store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use itertools::Itertools;
use ndarray::Array2;

use crate::board::{Board, CornerCount, StitchCorners};
use crate::cell::CellCode;
use crate::location::{Coord, Location, Vertex};
use crate::saved::{CellRef, SavedBoardState};

/// An immutable view of a [`GameStateStore`](crate::GameStateStore) at one moment.
///
/// A fresh snapshot is built after every command. The static level data is shared with the
/// store; the path and working grid are copies.
#[derive(Clone, Debug)]
pub struct Snapshot {
    level_index: Option<usize>,
    board: Arc<Board>,
    grid: Array2<CellCode>,
    path: Vec<Location>,
    visited: HashSet<Location>,
    index_by_cell: HashMap<Location, usize>,
}

impl Snapshot {
    pub(crate) fn new(level_index: Option<usize>, board: Arc<Board>, grid: Array2<CellCode>, path: Vec<Location>) -> Self {
        let index_by_cell = path.iter().enumerate().map(|(i, loc)| (*loc, i)).collect::<HashMap<_, _>>();
        Self {
            level_index,
            board,
            grid,
            visited: index_by_cell.keys().copied().collect(),
            index_by_cell,
            path,
        }
    }

    /// The loaded level, or [`None`] before the first load.
    pub fn level_index(&self) -> Option<usize> {
        self.level_index
    }

    /// Number of rows.
    pub fn rows(&self) -> Coord {
        self.board.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> Coord {
        self.board.cols
    }

    /// Cells a complete path must cover.
    pub fn total_usable(&self) -> usize {
        self.board.total_usable
    }

    /// The path, in drawing order.
    pub fn path(&self) -> &[Location] {
        &self.path
    }

    /// The cells on the path.
    pub fn visited(&self) -> &HashSet<Location> {
        &self.visited
    }

    /// The working grid, with movable walls where they currently stand.
    pub fn grid(&self) -> &Array2<CellCode> {
        &self.grid
    }

    /// The working code at `location`, or [`None`] out of bounds.
    pub fn cell(&self, location: Location) -> Option<CellCode> {
        self.grid.get(location.as_index()).copied()
    }

    /// The static level.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Stitch vertices, in level order.
    pub fn stitches(&self) -> &[Vertex] {
        &self.board.stitches
    }

    /// Stitch vertices, for lookup.
    pub fn stitch_set(&self) -> &HashSet<Vertex> {
        &self.board.stitch_set
    }

    /// The four cells each stitch joins.
    pub fn stitch_req(&self) -> &HashMap<Vertex, StitchCorners> {
        &self.board.stitch_req
    }

    /// Corner-count constraints, in level order.
    pub fn corner_counts(&self) -> &[CornerCount] {
        &self.board.corner_counts
    }

    /// Position of `location` along the path, if the path visits it.
    pub fn index_of(&self, location: Location) -> Option<usize> {
        self.index_by_cell.get(&location).copied()
    }

    /// Whether the path is a closed loop, i.e. its two ends are themselves adjacent.
    pub fn is_closed_loop(&self) -> bool {
        match (self.path.first(), self.path.last()) {
            (Some(head), Some(tail)) if self.path.len() > 1 => self.board.adjacent(*head, *tail),
            _ => false,
        }
    }

    /// The persisted form of this board: its path and current movable wall placement.
    pub fn to_saved(&self) -> SavedBoardState {
        SavedBoardState {
            path: self.path.iter().copied().map(CellRef::from).collect_vec(),
            movable_walls: Some(self.grid.indexed_iter()
                .filter(|(_, code)| **code == CellCode::MovableWall)
                .map(|(index, _)| CellRef::from(Location::from(index)))
                .collect_vec()),
        }
    }
}
