//! Fixed parameters of the signature format and the persistence layout.
//!
//! Changing any of the separators changes every canonical signature, and with it the
//! meaning of every persisted score ledger.

/// Separates the constraint signature from the topology signature.
pub const SIGNATURE_SEPARATOR: &str = "||";

/// Joins the three event categories of a constraint signature.
pub const CATEGORY_SEPARATOR: &str = "|";

/// Joins the events within one category.
pub const EVENT_SEPARATOR: &str = ">";

/// Renders a category (or a topology word) with no events.
pub const EMPTY_MARKER: &str = "-";

/// Joins generator tokens of a topology word.
pub const GENERATOR_SEPARATOR: &str = ",";

/// Default number of generated levels a [`CachedLevelSource`](crate::level::CachedLevelSource) keeps.
pub const LEVEL_CACHE_CAPACITY: usize = 32;

/// Storage key under which the serialized score ledger is kept.
pub const SCORE_STORAGE_KEY: &str = "stitchpath.score.v1";

/// Prefix of the per-level storage keys under which in-progress boards are kept.
pub const BOARD_STORAGE_KEY: &str = "stitchpath.board.v1";
