//! A playable session: the store, its rule evaluator, board saves and scoring, wired together.

use std::collections::HashMap;

use log::{debug, warn};

use crate::command::{Command, Transition};
use crate::error::{LevelError, PersistError};
use crate::level::LevelSource;
use crate::rules::{Completion, CompletionKind, EvaluationBundle, RuleEvaluator};
use crate::saved::SavedBoardState;
use crate::score::{RegisterOutcome, ScoreManager, ScoreMode, ScorePersistence};
use crate::signature::canonical_signature;
use crate::store::GameStateStore;

/// Where in-progress boards are kept, one per level.
///
/// Writes are fire and forget, like [`ScorePersistence`].
pub trait BoardPersistence {
    /// The board last saved for the level, if any.
    fn load(&self, level_index: usize) -> Option<String>;
    /// Replace the level's saved board.
    fn save(&mut self, level_index: usize, serialized: &str) -> Result<(), PersistError>;
}

/// Keeps saved boards in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBoardStore {
    boards: HashMap<usize, String>,
}

impl BoardPersistence for MemoryBoardStore {
    fn load(&self, level_index: usize) -> Option<String> {
        self.boards.get(&level_index).cloned()
    }

    fn save(&mut self, level_index: usize, serialized: &str) -> Result<(), PersistError> {
        self.boards.insert(level_index, serialized.to_string());
        Ok(())
    }
}

/// Everything one dispatched command led to.
#[derive(Clone, Debug)]
pub struct SessionEvent {
    /// What the store did.
    pub transition: Transition,
    /// The evaluator's verdicts, if the transition asked for validation.
    pub evaluation: Option<EvaluationBundle>,
    /// The completion check, if the transition asked for validation.
    pub completion: Option<Completion>,
    /// Canonical signature of a good completion.
    pub signature: Option<String>,
    /// How the ledger received a good completion.
    pub outcome: Option<RegisterOutcome>,
}

/// One player's game: a store, the rule evaluator judging it and the board saves behind it.
///
/// Commands flow store → evaluator → (on a good completion) signature → score ledger. The ledger
/// is passed in per call so that one ledger can outlive and serve many sessions.
pub struct PuzzleSession<S, E, B> {
    store: GameStateStore<S>,
    evaluator: E,
    boards: B,
    mode: ScoreMode,
    date_key: Option<String>,
}

impl<S, E, B> PuzzleSession<S, E, B>
where
    S: LevelSource,
    E: RuleEvaluator,
    B: BoardPersistence,
{
    /// A session crediting solutions in `mode`. Daily sessions also need [`Self::with_date_key`].
    pub fn new(store: GameStateStore<S>, evaluator: E, boards: B, mode: ScoreMode) -> Self {
        Self {
            store,
            evaluator,
            boards,
            mode,
            date_key: None,
        }
    }

    /// Daily sessions are keyed by date rather than by level index.
    pub fn with_date_key(mut self, date_key: impl Into<String>) -> Self {
        self.date_key = Some(date_key.into());
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &GameStateStore<S> {
        &self.store
    }

    /// The board persistence collaborator.
    pub fn boards(&self) -> &B {
        &self.boards
    }

    /// The key solutions are credited under, once a level is loaded.
    pub fn level_key(&self) -> Option<String> {
        match self.mode {
            ScoreMode::Daily => self.date_key.clone(),
            ScoreMode::Infinite => self.store.level_index().map(|index| index.to_string()),
        }
    }

    /// Load level `index` and bring back its saved board, if one was saved and still validates.
    ///
    /// Returns whether a saved board was restored. A rejected save leaves the fresh level in place.
    pub fn restore_or_load(&mut self, index: usize) -> Result<bool, LevelError> {
        self.store.load_level(index)?;

        let Some(raw) = self.boards.load(index) else {
            return Ok(false);
        };

        let restored = SavedBoardState::from_json(&raw)
            .and_then(|saved| self.store.restore_mutable_state(&saved));
        if let Err(e) = &restored {
            debug!("[PuzzleSession] Falling back to fresh level {}: {}", index, e);
            self.store.load_level(index)?;
        }
        Ok(restored.is_ok())
    }

    fn save_board(&mut self, transition: &Transition) {
        let Some(index) = transition.snapshot.level_index() else {
            return;
        };

        let written = transition.snapshot.to_saved()
            .to_json()
            .map_err(PersistError::from)
            .and_then(|serialized| self.boards.save(index, &serialized));
        if let Err(e) = written {
            warn!("[PuzzleSession] Could not save board for level {}: {}", index, e);
        }
    }

    /// Dispatch `command`, save the board if it changed, and judge the result.
    ///
    /// A good completion is signed and credited in `scores`.
    pub fn dispatch<P>(&mut self, command: Command, scores: &mut ScoreManager<P>) -> Result<SessionEvent, LevelError>
    where
        P: ScorePersistence,
    {
        let transition = self.store.dispatch(command)?;
        if transition.changed {
            self.save_board(&transition);
        }

        let mut event = SessionEvent {
            evaluation: None,
            completion: None,
            signature: None,
            outcome: None,
            transition,
        };
        if !event.transition.validate {
            return Ok(event);
        }

        let evaluation = self.evaluator.evaluate(&event.transition.snapshot);
        let completion = self.evaluator.check_completion(&event.transition.snapshot, &evaluation);
        if completion.kind == Some(CompletionKind::Good) {
            let signature = canonical_signature(&event.transition.snapshot);
            match self.level_key() {
                Some(level_key) => event.outcome = Some(scores.register_solved(self.mode, &level_key, &signature)),
                None => warn!("[PuzzleSession] Solved {} level without a key to credit it under; is the date key set?", self.mode),
            }
            event.signature = Some(signature);
        }

        event.evaluation = Some(evaluation);
        event.completion = Some(completion);
        Ok(event)
    }
}
