//! The persisted shape of a board in progress.

use serde::{Deserialize, Serialize};

use crate::error::RestoreError;
use crate::location::Location;

/// A cell reference as persisted: either `[r, c]` or `{"r": r, "c": c}`.
///
/// Coordinates are signed so that negative garbage parses and is rejected as out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellRef {
    /// `[r, c]`
    Pair([i64; 2]),
    /// `{"r": r, "c": c}`
    Object {
        /// Row.
        r: i64,
        /// Column.
        c: i64,
    },
}

impl CellRef {
    /// The referenced location, or [`None`] for negative coordinates.
    pub fn location(&self) -> Option<Location> {
        match *self {
            Self::Pair([r, c]) | Self::Object { r, c } => Location::from_signed(r, c),
        }
    }
}

impl From<Location> for CellRef {
    fn from(location: Location) -> Self {
        // usize -> i64 only fails for grids no level can describe
        Self::Pair([
            i64::try_from(location.0).unwrap_or(i64::MAX),
            i64::try_from(location.1).unwrap_or(i64::MAX),
        ])
    }
}

/// The mutable part of a board in progress: the path and where the movable walls stand.
///
/// `movable_walls` may be omitted, in which case the level's own placement is assumed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBoardState {
    /// The path, in order.
    #[serde(default)]
    pub path: Vec<CellRef>,
    /// Where every movable wall stands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movable_walls: Option<Vec<CellRef>>,
}

impl SavedBoardState {
    /// Parse a saved board; anything unparseable is [`RestoreError::Malformed`].
    pub fn from_json(raw: &str) -> Result<Self, RestoreError> {
        serde_json::from_str(raw).map_err(|e| RestoreError::Malformed(e.to_string()))
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
