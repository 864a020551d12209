//! Browser bindings. Everything crosses the boundary as JSON strings.

use itertools::Itertools;
use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::command::Transition;
use crate::config::{BOARD_STORAGE_KEY, SCORE_STORAGE_KEY};
use crate::level::{Level, LevelSource};
use crate::saved::{CellRef, SavedBoardState};
use crate::score::{MemoryScoreStore, ScoreManager, ScoreMode};
use crate::signature::canonical_signature;
use crate::store::GameStateStore;

/// A level source backed by a JS function `index => levelJson | null`.
pub struct JsLevelSource(Function);

impl LevelSource for JsLevelSource {
    fn level(&mut self, index: usize) -> Option<Level> {
        let value = self.0.call1(&JsValue::NULL, &JsValue::from_f64(index as f64)).ok()?;
        serde_json::from_str(&value.as_string()?).ok()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionView {
    changed: bool,
    rebuild_grid: bool,
    validate: bool,
    command: String,
    level_index: Option<usize>,
    rows: usize,
    cols: usize,
    total_usable: usize,
    path: Vec<CellRef>,
    grid: Vec<String>,
}

impl From<&Transition> for TransitionView {
    fn from(transition: &Transition) -> Self {
        let snapshot = &transition.snapshot;
        Self {
            changed: transition.changed,
            rebuild_grid: transition.rebuild_grid,
            validate: transition.validate,
            command: transition.command.clone(),
            level_index: snapshot.level_index(),
            rows: snapshot.rows(),
            cols: snapshot.cols(),
            total_usable: snapshot.total_usable(),
            path: snapshot.path().iter().copied().map(CellRef::from).collect_vec(),
            grid: snapshot.grid()
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|code| code.as_char()).collect::<String>())
                .collect_vec(),
        }
    }
}

/// A [`GameStateStore`] for the browser.
#[wasm_bindgen]
pub struct WasmStore {
    store: GameStateStore<JsLevelSource>,
}

#[wasm_bindgen]
impl WasmStore {
    /// `level_source` maps a level index to level JSON, or `null`.
    #[wasm_bindgen(constructor)]
    pub fn new(level_source: Function) -> Self {
        Self { store: GameStateStore::new(JsLevelSource(level_source)) }
    }

    /// Dispatch a `{type, payload}` command and return the transition as JSON.
    pub fn dispatch(&mut self, command_json: &str) -> Result<String, JsError> {
        let transition = self.store.dispatch_json(command_json).map_err(|e| JsError::new(&e.to_string()))?;
        serde_json::to_string(&TransitionView::from(&transition)).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Restore a saved board; `false` means the caller should load the level afresh.
    pub fn restore(&mut self, saved_json: &str) -> bool {
        SavedBoardState::from_json(saved_json)
            .and_then(|saved| self.store.restore_mutable_state(&saved))
            .is_ok()
    }

    /// The current board in its saved form.
    pub fn saved_json(&self) -> Result<String, JsError> {
        self.store.snapshot().to_saved().to_json().map_err(|e| JsError::new(&e.to_string()))
    }

    /// The canonical signature of the current path.
    #[wasm_bindgen(js_name = canonicalSignature)]
    pub fn canonical_signature(&self) -> String {
        canonical_signature(&self.store.snapshot())
    }
}

/// A [`ScoreManager`] for the browser; the host persists [`Self::state_json`] itself.
#[wasm_bindgen]
pub struct WasmScores {
    scores: ScoreManager<MemoryScoreStore>,
}

#[wasm_bindgen]
impl WasmScores {
    /// Start from a previously saved ledger, if there is one.
    #[wasm_bindgen(constructor)]
    pub fn new(serialized: Option<String>) -> Self {
        let persistence = serialized.map(MemoryScoreStore::with_contents).unwrap_or_default();
        Self { scores: ScoreManager::load(persistence) }
    }

    /// Register a solution; returns the points awarded.
    #[wasm_bindgen(js_name = registerSolved)]
    pub fn register_solved(&mut self, mode: &str, level_key: &str, signature: &str) -> Result<f64, JsError> {
        let mode = mode.parse::<ScoreMode>().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.scores.register_solved(mode, level_key, signature).awarded as f64)
    }

    /// The ledger, serialized for the host to persist.
    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.scores.read_score_state()).map_err(|e| JsError::new(&e.to_string()))
    }
}

/// Key the host should persist [`WasmScores::state_json`] under.
#[wasm_bindgen(js_name = scoreStorageKey)]
pub fn score_storage_key() -> String {
    SCORE_STORAGE_KEY.to_string()
}

/// Key the host should persist [`WasmStore::saved_json`] under, suffixed with the level index.
#[wasm_bindgen(js_name = boardStorageKey)]
pub fn board_storage_key(level_index: usize) -> String {
    format!("{}.{}", BOARD_STORAGE_KEY, level_index)
}
