//! The interface to the rule evaluator.
//!
//! Judging hints, stitches, rock-paper-scissors cells and blocked cells is not this crate's job;
//! an evaluator is handed snapshots and reports back. The only rule provided here is
//! [`CoverageEvaluator`], which knows nothing about constraints.

use crate::snapshot::Snapshot;

/// The verdict on one family of constraints.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Status {
    /// Every constraint of the family holds.
    Satisfied,
    /// Nothing is violated yet but the path is not far enough along to tell.
    #[default]
    Pending,
    /// At least one constraint is broken.
    Violated,
}

/// Every family's verdict for one snapshot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EvaluationBundle {
    /// Hint cells.
    pub hints: Status,
    /// Stitch vertices.
    pub stitches: Status,
    /// Rock-paper-scissors cells.
    pub rps: Status,
    /// Cells the path must not or cannot use.
    pub blocked_cells: Status,
}

impl EvaluationBundle {
    /// Whether every family is [`Status::Satisfied`].
    pub fn all_satisfied(&self) -> bool {
        [self.hints, self.stitches, self.rps, self.blocked_cells].iter().all(|status| *status == Status::Satisfied)
    }
}

/// How a complete path was judged.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompletionKind {
    /// A correct solution; it gets a canonical signature and is registered for scoring.
    Good,
    /// The path is complete but wrong.
    Bad,
}

/// The evaluator's verdict on the path as a whole.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Completion {
    /// [`None`] while the path is incomplete.
    pub kind: Option<CompletionKind>,
    /// Text to show the player, if any.
    pub message: Option<String>,
}

/// Judges snapshots against the level's constraints.
///
/// Implementors supply one check per constraint family plus the completion check; [`evaluate`](Self::evaluate) bundles the four checks.
pub trait RuleEvaluator {
    /// Check hint cells.
    fn evaluate_hints(&self, snapshot: &Snapshot) -> Status;
    /// Check stitch vertices.
    fn evaluate_stitches(&self, snapshot: &Snapshot) -> Status;
    /// Check rock-paper-scissors cells.
    fn evaluate_rps(&self, snapshot: &Snapshot) -> Status;
    /// Check that no blocked cell is used and every usable one is.
    fn evaluate_blocked_cells(&self, snapshot: &Snapshot) -> Status;
    /// Decide whether the path is a finished solution, and whether it is correct.
    fn check_completion(&self, snapshot: &Snapshot, evaluation: &EvaluationBundle) -> Completion;

    /// Run every family check.
    fn evaluate(&self, snapshot: &Snapshot) -> EvaluationBundle {
        EvaluationBundle {
            hints: self.evaluate_hints(snapshot),
            stitches: self.evaluate_stitches(snapshot),
            rps: self.evaluate_rps(snapshot),
            blocked_cells: self.evaluate_blocked_cells(snapshot),
        }
    }
}

/// Accepts any path that covers every usable cell; every constraint family counts as satisfied.
#[derive(Copy, Clone, Debug, Default)]
pub struct CoverageEvaluator;

impl RuleEvaluator for CoverageEvaluator {
    fn evaluate_hints(&self, _snapshot: &Snapshot) -> Status {
        Status::Satisfied
    }

    fn evaluate_stitches(&self, _snapshot: &Snapshot) -> Status {
        Status::Satisfied
    }

    fn evaluate_rps(&self, _snapshot: &Snapshot) -> Status {
        Status::Satisfied
    }

    fn evaluate_blocked_cells(&self, _snapshot: &Snapshot) -> Status {
        Status::Satisfied
    }

    fn check_completion(&self, snapshot: &Snapshot, evaluation: &EvaluationBundle) -> Completion {
        if snapshot.total_usable() == 0 || snapshot.path().len() < snapshot.total_usable() {
            return Completion::default();
        }

        if evaluation.all_satisfied() {
            Completion { kind: Some(CompletionKind::Good), message: None }
        } else {
            Completion { kind: Some(CompletionKind::Bad), message: Some("constraints violated".to_string()) }
        }
    }
}
