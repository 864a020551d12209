//! Commands, their wire envelope, and what dispatching one did.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::saved::CellRef;
use crate::snapshot::Snapshot;

/// The command types understood by [`GameStateStore::dispatch`](crate::GameStateStore::dispatch), keyed by their wire name.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, EnumString, IntoStaticStr)]
pub enum CommandKind {
    /// `level/load`
    #[strum(serialize = "level/load")]
    LoadLevel,
    /// `path/start-or-step`
    #[strum(serialize = "path/start-or-step")]
    StartOrStep,
    /// `path/start-or-step-from-start`
    #[strum(serialize = "path/start-or-step-from-start")]
    StartOrStepFromStart,
    /// `path/finalize-after-pointer`
    #[strum(serialize = "path/finalize-after-pointer")]
    FinalizeAfterPointer,
    /// `path/reset`
    #[strum(serialize = "path/reset")]
    ResetPath,
    /// `path/reverse`
    #[strum(serialize = "path/reverse")]
    ReversePath,
    /// `wall/move-attempt`
    #[strum(serialize = "wall/move-attempt")]
    MoveWall,
}

/// A player-facing mutation of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Load a level and reset path and grid.
    LoadLevel {
        /// Index into the level source.
        level_index: usize,
    },
    /// See [`GameStateStore::start_or_try_step`](crate::GameStateStore::start_or_try_step).
    StartOrStep(CellRef),
    /// See [`GameStateStore::start_or_try_step_from_start`](crate::GameStateStore::start_or_try_step_from_start).
    StartOrStepFromStart(CellRef),
    /// Drop a lone cell once the pointer is released.
    FinalizeAfterPointer,
    /// Clear the path.
    ResetPath,
    /// Reverse the path.
    ReversePath,
    /// Relocate a movable wall.
    MoveWall {
        /// Where the movable wall stands.
        from: CellRef,
        /// The empty cell to move it to.
        to: CellRef,
    },
    /// Any type the store does not recognise. Dispatching it changes nothing.
    Unknown(String),
}

/// The `{type, payload}` shape commands arrive in from adapters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// The command type, e.g. `path/reset`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific arguments; absent for commands that take none.
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadPayload {
    level_index: usize,
}

#[derive(Deserialize)]
struct MovePayload {
    from: CellRef,
    to: CellRef,
}

impl Command {
    /// The kind of this command, or [`None`] for [`Command::Unknown`].
    pub fn kind(&self) -> Option<CommandKind> {
        Some(match self {
            Self::LoadLevel { .. } => CommandKind::LoadLevel,
            Self::StartOrStep(_) => CommandKind::StartOrStep,
            Self::StartOrStepFromStart(_) => CommandKind::StartOrStepFromStart,
            Self::FinalizeAfterPointer => CommandKind::FinalizeAfterPointer,
            Self::ResetPath => CommandKind::ResetPath,
            Self::ReversePath => CommandKind::ReversePath,
            Self::MoveWall { .. } => CommandKind::MoveWall,
            Self::Unknown(_) => return None,
        })
    }

    /// The wire name of this command's type.
    pub fn name(&self) -> &str {
        match (self, self.kind()) {
            (Self::Unknown(name), _) => name,
            (_, Some(kind)) => <&'static str>::from(kind),
            (_, None) => "",
        }
    }
}

impl TryFrom<CommandEnvelope> for Command {
    type Error = serde_json::Error;

    /// Unknown types become [`Command::Unknown`]; a known type with a malformed payload is an error.
    fn try_from(envelope: CommandEnvelope) -> Result<Self, Self::Error> {
        let Ok(kind) = envelope.kind.parse::<CommandKind>() else {
            return Ok(Self::Unknown(envelope.kind));
        };

        Ok(match kind {
            CommandKind::LoadLevel => {
                let LoadPayload { level_index } = serde_json::from_value(envelope.payload)?;
                Self::LoadLevel { level_index }
            }
            CommandKind::StartOrStep => Self::StartOrStep(serde_json::from_value(envelope.payload)?),
            CommandKind::StartOrStepFromStart => Self::StartOrStepFromStart(serde_json::from_value(envelope.payload)?),
            CommandKind::FinalizeAfterPointer => Self::FinalizeAfterPointer,
            CommandKind::ResetPath => Self::ResetPath,
            CommandKind::ReversePath => Self::ReversePath,
            CommandKind::MoveWall => {
                let MovePayload { from, to } = serde_json::from_value(envelope.payload)?;
                Self::MoveWall { from, to }
            }
        })
    }
}

/// What a dispatched command did.
#[derive(Clone, Debug)]
pub struct Transition {
    /// The path or grid was mutated.
    pub changed: bool,
    /// The grid's shape changed; only a level load sets this.
    pub rebuild_grid: bool,
    /// The caller should run the rule evaluator on [`snapshot`](Self::snapshot).
    pub validate: bool,
    /// Wire name of the dispatched command.
    pub command: String,
    /// The state after the command.
    pub snapshot: Snapshot,
}
