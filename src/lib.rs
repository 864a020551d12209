#![warn(missing_docs)]

//! # `stitchpath`
//!
//! The core of a single-path grid puzzle. The player draws one non-self-intersecting path through
//! the usable cells of a grid, may relocate movable walls, and may cut diagonally through special
//! "stitch" vertices.
//!
//! Begin by obtaining [`Level`]s, either as JSON or through a [`LevelBuilder`], behind some
//! [`LevelSource`]. Hand the source to a [`GameStateStore`] and drive it with [`Command`]s through
//! [`GameStateStore::dispatch`]; every command returns a [`Transition`] carrying a fresh [`Snapshot`].
//! Once an external rule evaluator judges a snapshot to be a correct solution, turn it into a
//! [`canonical_signature`] and credit it in a [`ScoreManager`]. [`PuzzleSession`] wires these together.
//!
//! # Signatures
//! A level rewards every *distinct* correct solution, the `n`th one being worth `n` points.
//! Two paths are the same solution if one is the other reversed or, for a closed loop, rotated.
//! They are different if they meet hint, stitch and corner constraints in a different order, or
//! if they wind differently around the interior wall clusters of the grid.
//!
//! A signature is `constraints || topology`:
//! - `constraints` is three `|`-separated event lists recording, in path order, how the path passes
//!   through hint and rock-paper-scissors cells, when each stitch diagonal is first crossed and when
//!   each corner count is first met;
//! - `topology` is a word in the free group generated by the interior wall islands, found by
//!   casting a ray from each island and recording signed crossings, then freely reduced and
//!   relabelled by first appearance.
//!
//! The canonical signature is the smallest over every reading of the path.

pub use board::Board;
pub use command::{Command, CommandKind, Transition};
pub use level::{Level, LevelBuilder, LevelPack, LevelSource};
pub use location::{Location, Vertex};
pub use score::{ScoreManager, ScoreMode};
pub use session::PuzzleSession;
pub use signature::canonical_signature;
pub use snapshot::Snapshot;
pub use store::GameStateStore;

pub mod board;
pub mod cell;
pub mod command;
pub mod config;
pub mod error;
pub mod level;
pub(crate) mod location;
pub mod rules;
pub mod saved;
pub mod score;
pub mod session;
pub(crate) mod signature;
pub mod snapshot;
pub mod step;
pub(crate) mod store;
mod tests;
pub(crate) mod topology;
#[cfg(feature = "wasm")]
pub mod wasm;
