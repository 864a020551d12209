//! The score ledger: which distinct solutions have been credited, per level and mode.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, VariantArray};

use crate::error::PersistError;

/// The two independent score tracks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, EnumString, VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum ScoreMode {
    /// Generated levels, keyed by level.
    Infinite,
    /// The daily puzzle, keyed by date.
    Daily,
}

/// The ledger exactly as persisted: per mode a running total and, per level key, the sorted
/// distinct canonical signatures already credited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedScoreState {
    /// Sum of every award in [`ScoreMode::Infinite`].
    pub infinite_total: u64,
    /// Sum of every award in [`ScoreMode::Daily`].
    pub daily_total: u64,
    /// Credited signatures per level index.
    pub infinite_by_level: BTreeMap<String, Vec<String>>,
    /// Credited signatures per date.
    pub daily_by_date: BTreeMap<String, Vec<String>>,
}

/// Both running totals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTotals {
    /// Total of [`ScoreMode::Infinite`].
    pub infinite: u64,
    /// Total of [`ScoreMode::Daily`].
    pub daily: u64,
}

/// What registering one solution did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// Points credited; the `n`th distinct solution of a level is worth `n`.
    pub awarded: u64,
    /// Whether the signature had not been credited before.
    pub is_new: bool,
    /// Distinct signatures now credited for the level key.
    pub level_distinct_count: usize,
    /// The mode's running total afterwards.
    pub mode_total: u64,
    /// Both totals after a new registration.
    pub totals: Option<ScoreTotals>,
}

/// Where the serialized ledger is kept between sessions.
///
/// Writes are fire and forget: a failed write is logged and never rolls back the in-memory ledger.
pub trait ScorePersistence {
    /// The last serialized ledger written, if any.
    fn read(&self) -> Option<String>;
    /// Replace the stored ledger.
    fn write(&mut self, serialized: &str) -> Result<(), PersistError>;
}

/// Keeps the serialized ledger in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryScoreStore {
    stored: Option<String>,
}

impl MemoryScoreStore {
    /// A store already holding `serialized`, e.g. a ledger carried over from elsewhere.
    pub fn with_contents(serialized: impl Into<String>) -> Self {
        Self { stored: Some(serialized.into()) }
    }
}

impl ScorePersistence for MemoryScoreStore {
    fn read(&self) -> Option<String> {
        self.stored.clone()
    }

    fn write(&mut self, serialized: &str) -> Result<(), PersistError> {
        self.stored = Some(serialized.to_string());
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ModeLedger {
    total: u64,
    by_key: BTreeMap<String, BTreeSet<String>>,
}

impl ModeLedger {
    fn from_persisted(total: u64, by_key: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            total,
            by_key: by_key.iter()
                .map(|(key, signatures)| (key.clone(), signatures.iter().cloned().collect()))
                .collect(),
        }
    }

    fn to_persisted(&self) -> BTreeMap<String, Vec<String>> {
        self.by_key.iter()
            .filter(|(_, signatures)| !signatures.is_empty())
            .map(|(key, signatures)| (key.clone(), signatures.iter().cloned().collect()))
            .collect()
    }

    fn distinct_count(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, BTreeSet::len)
    }
}

fn floor_non_negative(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        n.floor() as u64
    } else {
        0
    }
}

fn normalize_total(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| n.as_f64().map_or(0, floor_non_negative)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>().ok()
                .or_else(|| s.parse::<f64>().ok().map(floor_non_negative))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn normalize_by_key(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };

    // keys that trim to the same key share one signature set
    let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key, signatures) in entries {
        let key = key.trim();
        let Value::Array(signatures) = signatures else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        merged.entry(key.to_string()).or_default().extend(signatures.iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|signature| !signature.is_empty())
            .map(str::to_string));
    }

    merged.into_iter()
        .filter(|(_, signatures)| !signatures.is_empty())
        .map(|(key, signatures)| (key, signatures.into_iter().collect()))
        .collect()
}

/// Coerce anything into a valid ledger.
///
/// Totals become non-negative integers (0 if missing or unreadable), signature lists become
/// trimmed, non-empty, deduplicated and sorted. Structure that is not an object at all yields
/// the empty ledger.
pub fn normalize_score_state(value: &Value) -> PersistedScoreState {
    let Value::Object(fields) = value else {
        return PersistedScoreState::default();
    };

    PersistedScoreState {
        infinite_total: normalize_total(fields.get("infiniteTotal")),
        daily_total: normalize_total(fields.get("dailyTotal")),
        infinite_by_level: normalize_by_key(fields.get("infiniteByLevel")),
        daily_by_date: normalize_by_key(fields.get("dailyByDate")),
    }
}

/// The score ledger: which distinct solutions have been credited, and the running totals.
pub struct ScoreManager<P> {
    persistence: P,
    infinite: ModeLedger,
    daily: ModeLedger,
}

impl<P> ScoreManager<P>
where
    P: ScorePersistence,
{
    /// Load the ledger from `persistence`. Missing or corrupt contents give an empty ledger.
    pub fn load(persistence: P) -> Self {
        let value = persistence.read()
            .and_then(|raw| match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("[ScoreManager] Discarding unreadable score state: {}", e);
                    None
                }
            })
            .unwrap_or(Value::Null);
        let state = normalize_score_state(&value);

        Self {
            persistence,
            infinite: ModeLedger::from_persisted(state.infinite_total, &state.infinite_by_level),
            daily: ModeLedger::from_persisted(state.daily_total, &state.daily_by_date),
        }
    }

    /// The persistence collaborator.
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn ledger(&self, mode: ScoreMode) -> &ModeLedger {
        match mode {
            ScoreMode::Infinite => &self.infinite,
            ScoreMode::Daily => &self.daily,
        }
    }

    fn ledger_mut(&mut self, mode: ScoreMode) -> &mut ModeLedger {
        match mode {
            ScoreMode::Infinite => &mut self.infinite,
            ScoreMode::Daily => &mut self.daily,
        }
    }

    /// Credit `signature` as a solution of `level_key`.
    ///
    /// Blank keys or signatures do nothing. A signature already credited for the key awards nothing.
    /// Otherwise the award is the level's new distinct-solution count, it is added to the mode total,
    /// and the ledger is written out.
    pub fn register_solved(&mut self, mode: ScoreMode, level_key: &str, signature: &str) -> RegisterOutcome {
        let (level_key, signature) = (level_key.trim(), signature.trim());
        if level_key.is_empty() || signature.is_empty() {
            return RegisterOutcome {
                mode_total: self.ledger(mode).total,
                level_distinct_count: self.ledger(mode).distinct_count(level_key),
                ..Default::default()
            };
        }

        let ledger = self.ledger_mut(mode);
        let signatures = ledger.by_key.entry(level_key.to_string()).or_default();
        if !signatures.insert(signature.to_string()) {
            return RegisterOutcome {
                awarded: 0,
                is_new: false,
                level_distinct_count: signatures.len(),
                mode_total: ledger.total,
                totals: None,
            };
        }

        let level_distinct_count = signatures.len();
        let awarded = level_distinct_count as u64;
        ledger.total = ledger.total.saturating_add(awarded);
        let mode_total = ledger.total;
        info!("[ScoreManager] {} {}: solution #{} awarded {} (total {})", mode, level_key, level_distinct_count, awarded, mode_total);

        self.persist();
        RegisterOutcome {
            awarded,
            is_new: true,
            level_distinct_count,
            mode_total,
            totals: Some(self.read_totals()),
        }
    }

    fn persist(&mut self) {
        let written = serde_json::to_string(&self.read_score_state())
            .map_err(PersistError::from)
            .and_then(|serialized| self.persistence.write(&serialized));
        if let Err(e) = written {
            warn!("[ScoreManager] Could not persist score state: {}", e);
        }
    }

    /// How many distinct solutions of `level_key` have been credited.
    pub fn read_distinct_count(&self, mode: ScoreMode, level_key: &str) -> usize {
        self.ledger(mode).distinct_count(level_key.trim())
    }

    /// Both running totals.
    pub fn read_totals(&self) -> ScoreTotals {
        ScoreTotals {
            infinite: self.infinite.total,
            daily: self.daily.total,
        }
    }

    /// The ledger in its persisted shape.
    pub fn read_score_state(&self) -> PersistedScoreState {
        PersistedScoreState {
            infinite_total: self.infinite.total,
            daily_total: self.daily.total,
            infinite_by_level: self.infinite.to_persisted(),
            daily_by_date: self.daily.to_persisted(),
        }
    }
}
