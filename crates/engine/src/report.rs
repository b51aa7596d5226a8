//! Per-cycle outcome reporting.

use bridge::{CardId, CycleId, ErrorClass, OffenseId};
use serde::Serialize;

/// What happened to one planned transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// A new card was created and recorded.
    Created { offense: OffenseId, card: CardId },
    /// An untracked card with the offense's title was found and recorded.
    Adopted { offense: OffenseId, card: CardId },
    /// The archive copy was created and the entry tombstoned.
    Archived {
        offense: OffenseId,
        original: CardId,
        archive: CardId,
    },
    /// Not actionable this cycle; will be reconsidered next cycle.
    Skipped { offense: OffenseId, reason: String },
    /// The transition was abandoned; the mapping was not changed.
    Failed {
        offense: OffenseId,
        class: ErrorClass,
        message: String,
    },
}

/// A best-effort step that failed after its transition was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestEffortFailure {
    pub offense: OffenseId,
    pub card: CardId,
    /// `"add_comment"`, `"assign_user"` or `"delete_card"`.
    pub operation: &'static str,
    pub message: String,
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    /// Offenses returned by the source this cycle.
    pub offenses_seen: usize,
    pub outcomes: Vec<TransitionOutcome>,
    pub best_effort_failures: Vec<BestEffortFailure>,
}

impl CycleReport {
    pub fn new(cycle_id: CycleId, offenses_seen: usize) -> Self {
        Self {
            cycle_id,
            offenses_seen,
            outcomes: Vec::new(),
            best_effort_failures: Vec::new(),
        }
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, TransitionOutcome::Created { .. }))
    }

    pub fn adopted(&self) -> usize {
        self.count(|o| matches!(o, TransitionOutcome::Adopted { .. }))
    }

    pub fn archived(&self) -> usize {
        self.count(|o| matches!(o, TransitionOutcome::Archived { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TransitionOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TransitionOutcome::Failed { .. }))
    }

    /// `true` when every transition completed and no best-effort step failed.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.best_effort_failures.is_empty()
    }

    fn count(&self, pred: impl Fn(&TransitionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
