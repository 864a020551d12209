//! Error types. Illegal moves are never errors; they are reported as unchanged transitions.

use thiserror::Error;

use crate::location::{Location, Vertex};
use crate::saved::CellRef;

/// Reasons a level cannot be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// The level source had nothing at this index. The caller must not keep playing the stale level.
    #[error("no level at index {index}")]
    Missing {
        /// The requested level index.
        index: usize,
    },
    /// The grid has no rows, or its first row is empty.
    #[error("level grid has no cells")]
    Empty,
    /// A row's length differs from the first row's.
    #[error("level row {row} has {found} cells, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A character outside the cell alphabet.
    #[error("unknown cell code {code:?} at {at}")]
    UnknownCellCode {
        /// The character found.
        code: char,
        /// Where it was found.
        at: Location,
    },
    /// Stitches need all four touching cells, so they must be interior vertices.
    #[error("stitch vertex {vertex} is not interior to the grid")]
    StitchOutOfBounds {
        /// The offending vertex.
        vertex: Vertex,
    },
    /// Corner-count vertices may lie on the border but not beyond it.
    #[error("corner-count vertex {vertex} lies outside the grid")]
    CornerOutOfBounds {
        /// The offending vertex.
        vertex: Vertex,
    },
    /// At most four edges meet at a vertex.
    #[error("corner-count target {target} at {vertex} exceeds 4")]
    CornerTargetTooLarge {
        /// The constrained vertex.
        vertex: Vertex,
        /// The requested target.
        target: usize,
    },
}

/// Reasons a saved board is rejected by [`GameStateStore::restore_mutable_state`](crate::GameStateStore::restore_mutable_state).
///
/// Every variant leaves the store untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// Boards can only be restored over a loaded level.
    #[error("no level is loaded")]
    NoLevel,
    /// The saved board is not valid JSON of the saved board shape.
    #[error("saved board is malformed: {0}")]
    Malformed(String),
    /// The saved board lists a different number of movable walls than the level has.
    #[error("saved board has {found} movable walls, level has {expected}")]
    MovableWallCount {
        /// Movable walls in the level.
        expected: usize,
        /// Movable walls in the saved board.
        found: usize,
    },
    /// Two movable walls share a cell.
    #[error("movable wall listed twice at {0}")]
    DuplicateMovableWall(Location),
    /// Out of bounds, or on a cell whose base code is neither empty nor a movable wall.
    #[error("movable wall cannot stand at {0:?}")]
    MovableWallPlacement(CellRef),
    /// A saved path cell lies outside the grid.
    #[error("saved path leaves the grid at index {index}")]
    PathOutOfBounds {
        /// Position of the cell within the saved path.
        index: usize,
    },
    /// The saved path is not simple.
    #[error("saved path visits {0} twice")]
    PathDuplicate(Location),
    /// The saved path runs through a cell blocked on the restored board.
    #[error("saved path crosses blocked cell {0}")]
    PathBlocked(Location),
    /// Consecutive saved path cells are not neighbours.
    #[error("saved path jumps from {from} to {to}")]
    PathNotAdjacent {
        /// The earlier cell.
        from: Location,
        /// The cell after it.
        to: Location,
    },
}

/// A persistence collaborator failed to write. In-memory state is unaffected.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The state could not be turned into JSON.
    #[error("could not serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The backing store refused the write.
    #[error("storage rejected write: {0}")]
    Storage(String),
}
