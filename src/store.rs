//! The path/grid state machine.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};
use ndarray::{Array2, AssignElem};

use crate::board::Board;
use crate::cell::CellCode;
use crate::command::{Command, CommandEnvelope, Transition};
use crate::error::{LevelError, RestoreError};
use crate::level::LevelSource;
use crate::location::Location;
use crate::saved::SavedBoardState;
use crate::snapshot::Snapshot;

/// The path/grid state machine.
///
/// Holds the working grid (where movable walls currently stand) and the ordered path, and keeps
/// both legal under every command: the path never repeats a cell, every consecutive pair of
/// path cells is adjacent per [`Board::adjacent`], and every path cell is usable.
///
/// Illegal moves are silently ignored. The only fatal failure is loading a level that does not exist
/// or does not validate.
pub struct GameStateStore<S> {
    source: S,
    level_index: Option<usize>,
    board: Arc<Board>,
    grid: Array2<CellCode>,
    path: Vec<Location>,
    visited: HashSet<Location>,
}

impl<S> GameStateStore<S>
where
    S: LevelSource,
{
    /// A store with no level loaded; every path command is a no-op until [`Self::load_level`] succeeds.
    pub fn new(source: S) -> Self {
        let board = Board::empty();
        Self {
            source,
            level_index: None,
            grid: board.base.clone(),
            board: Arc::new(board),
            path: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// The loaded level, if any.
    pub fn level_index(&self) -> Option<usize> {
        self.level_index
    }

    /// The level source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch level `index` from the level source and reset path and grid to its base state.
    ///
    /// On failure the previous state is kept as is, but the caller must not continue playing it.
    pub fn load_level(&mut self, index: usize) -> Result<(), LevelError> {
        let level = self.source.level(index).ok_or(LevelError::Missing { index })?;
        let board = Board::try_from(&level)?;

        info!("[GameStateStore] Loaded level {} ({}x{}, {} stitches)", index, board.rows, board.cols, board.stitches.len());
        self.grid = board.base.clone();
        self.board = Arc::new(board);
        self.level_index = Some(index);
        self.path.clear();
        self.visited.clear();
        Ok(())
    }

    #[inline]
    fn is_usable(&self, location: Location) -> bool {
        self.grid.get(location.as_index()).is_some_and(CellCode::is_usable)
    }

    fn begin_path(&mut self, location: Location) -> bool {
        self.path.push(location);
        self.visited.insert(location);
        true
    }

    /// Grow, shrink or start the path at its tail.
    ///
    /// Stepping onto the second-to-last cell backtracks one cell. Stepping onto an unvisited cell
    /// adjacent to the tail appends it. Anything else, including blocked or out of bounds targets,
    /// changes nothing.
    pub fn start_or_try_step(&mut self, target: Location) -> bool {
        if !self.is_usable(target) {
            debug!("[GameStateStore] Ignoring step onto unusable cell {}", target);
            return false;
        }

        let Some(&tail) = self.path.last() else {
            return self.begin_path(target);
        };

        if self.path.len() >= 2 && self.path[self.path.len() - 2] == target {
            if let Some(popped) = self.path.pop() {
                self.visited.remove(&popped);
            }
            return true;
        }

        if !self.visited.contains(&target) && self.board.adjacent(tail, target) {
            self.path.push(target);
            self.visited.insert(target);
            return true;
        }

        debug!("[GameStateStore] Ignoring step {} -> {}", tail, target);
        false
    }

    /// [`Self::start_or_try_step`], mirrored to work at the head of the path.
    pub fn start_or_try_step_from_start(&mut self, target: Location) -> bool {
        if !self.is_usable(target) {
            debug!("[GameStateStore] Ignoring step onto unusable cell {}", target);
            return false;
        }

        let Some(&head) = self.path.first() else {
            return self.begin_path(target);
        };

        if self.path.get(1) == Some(&target) {
            let popped = self.path.remove(0);
            self.visited.remove(&popped);
            return true;
        }

        if !self.visited.contains(&target) && self.board.adjacent(head, target) {
            self.path.insert(0, target);
            self.visited.insert(target);
            return true;
        }

        debug!("[GameStateStore] Ignoring step {} -> {} at path start", head, target);
        false
    }

    /// A single placed cell is not a path; drop it once the pointer is released.
    pub fn finalize_path_after_pointer_up(&mut self) -> bool {
        if self.path.len() == 1 {
            self.reset_path()
        } else {
            false
        }
    }

    /// Clear the path. Reports a change only if there was a path to clear.
    pub fn reset_path(&mut self) -> bool {
        let had_path = !self.path.is_empty();
        self.path.clear();
        self.visited.clear();
        had_path
    }

    /// Reverse the path in place. Paths shorter than two cells are left alone.
    pub fn reverse_path(&mut self) -> bool {
        if self.path.len() < 2 {
            return false;
        }

        self.path.reverse();
        true
    }

    /// Relocate the movable wall at `from` to the empty, unvisited cell `to`.
    pub fn move_wall(&mut self, from: Location, to: Location) -> bool {
        let legal = from != to
            && self.grid.get(from.as_index()) == Some(&CellCode::MovableWall)
            && self.grid.get(to.as_index()) == Some(&CellCode::Empty)
            && !self.visited.contains(&to);
        if !legal {
            debug!("[GameStateStore] Ignoring wall move {} -> {}", from, to);
            return false;
        }

        if let Some(cell) = self.grid.get_mut(from.as_index()) {
            cell.assign_elem(CellCode::Empty);
        }
        if let Some(cell) = self.grid.get_mut(to.as_index()) {
            cell.assign_elem(CellCode::MovableWall);
        }
        true
    }

    /// Rebuild grid and path from a persisted board.
    ///
    /// The movable walls must match the level's count and stand only where the base grid is empty
    /// or a movable wall; the path must be duplicate free, in bounds, usable under the rebuilt grid and
    /// adjacent step by step. Any violation leaves the store untouched; the caller should fall back
    /// to a fresh [`Self::load_level`].
    pub fn restore_mutable_state(&mut self, saved: &SavedBoardState) -> Result<(), RestoreError> {
        let result = self.validate_saved(saved);
        match result {
            Ok((grid, path)) => {
                self.visited = path.iter().copied().collect();
                self.path = path;
                self.grid = grid;
                Ok(())
            }
            Err(e) => {
                warn!("[GameStateStore] Rejected saved board: {}", e);
                Err(e)
            }
        }
    }

    fn validate_saved(&self, saved: &SavedBoardState) -> Result<(Array2<CellCode>, Vec<Location>), RestoreError> {
        if self.level_index.is_none() {
            return Err(RestoreError::NoLevel);
        }

        let walls = match &saved.movable_walls {
            None => self.board.base_movable_wall_locations(),
            Some(walls) => {
                if walls.len() != self.board.base_movable_walls {
                    return Err(RestoreError::MovableWallCount { expected: self.board.base_movable_walls, found: walls.len() });
                }

                let mut placed = HashSet::with_capacity(walls.len());
                let mut locations = Vec::with_capacity(walls.len());
                for wall in walls {
                    let Some(location) = wall.location().filter(|location| self.board.hosts_movable_wall(*location)) else {
                        return Err(RestoreError::MovableWallPlacement(*wall));
                    };
                    if !placed.insert(location) {
                        return Err(RestoreError::DuplicateMovableWall(location));
                    }
                    locations.push(location);
                }
                locations
            }
        };

        let mut grid = self.board.base.mapv(|code| match code {
            CellCode::MovableWall => CellCode::Empty,
            other => other,
        });
        for wall in walls {
            if let Some(cell) = grid.get_mut(wall.as_index()) {
                cell.assign_elem(CellCode::MovableWall);
            }
        }

        let mut seen = HashSet::with_capacity(saved.path.len());
        let mut path = Vec::with_capacity(saved.path.len());
        for (index, cell) in saved.path.iter().enumerate() {
            let location = cell.location()
                .filter(|location| self.board.in_bounds(*location))
                .ok_or(RestoreError::PathOutOfBounds { index })?;
            if !seen.insert(location) {
                return Err(RestoreError::PathDuplicate(location));
            }
            if !grid.get(location.as_index()).is_some_and(CellCode::is_usable) {
                return Err(RestoreError::PathBlocked(location));
            }
            path.push(location);
        }

        if let Some((from, to)) = path.iter().tuple_windows().find(|(a, b)| !self.board.adjacent(**a, **b)) {
            return Err(RestoreError::PathNotAdjacent { from: *from, to: *to });
        }

        Ok((grid, path))
    }

    /// An immutable view of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.level_index, Arc::clone(&self.board), self.grid.clone(), self.path.clone())
    }

    /// Apply one command and describe what happened.
    ///
    /// Only [`Command::LoadLevel`] can fail; every other command either mutates legally or reports
    /// `changed: false`.
    pub fn dispatch(&mut self, command: Command) -> Result<Transition, LevelError> {
        let mut rebuild_grid = false;
        let changed = match &command {
            Command::LoadLevel { level_index } => {
                self.load_level(*level_index)?;
                rebuild_grid = true;
                true
            }
            Command::StartOrStep(cell) => cell.location().is_some_and(|target| self.start_or_try_step(target)),
            Command::StartOrStepFromStart(cell) => cell.location().is_some_and(|target| self.start_or_try_step_from_start(target)),
            Command::FinalizeAfterPointer => self.finalize_path_after_pointer_up(),
            Command::ResetPath => self.reset_path(),
            Command::ReversePath => self.reverse_path(),
            Command::MoveWall { from, to } => match (from.location(), to.location()) {
                (Some(from), Some(to)) => self.move_wall(from, to),
                _ => false,
            },
            Command::Unknown(name) => {
                debug!("[GameStateStore] Ignoring unknown command {:?}", name);
                false
            }
        };

        Ok(Transition {
            changed,
            rebuild_grid,
            validate: changed,
            command: command.name().to_string(),
            snapshot: self.snapshot(),
        })
    }

    /// [`Self::dispatch`] for a raw `{type, payload}` envelope. Envelopes that do not parse are ignored.
    pub fn dispatch_json(&mut self, raw: &str) -> Result<Transition, LevelError> {
        let command = serde_json::from_str::<CommandEnvelope>(raw)
            .and_then(Command::try_from)
            .unwrap_or_else(|e| {
                debug!("[GameStateStore] Ignoring malformed command: {}", e);
                Command::Unknown(String::new())
            });
        self.dispatch(command)
    }
}
