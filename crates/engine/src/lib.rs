//! offense-deck reconciliation engine.
//!
//! Each polling cycle the [`Engine`] diffs the offense listing against the
//! persisted mapping, creates cards for new offenses, archives cards whose
//! offense closed, and commits every change to the mapping store.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The engine sequences calls between the domain
//! rules in [`bridge`] and the three port traits. It contains no HTTP or file
//! handling of its own; [`plan`](plan::plan) is a pure function and can be
//! reasoned about without any gateway.

pub mod engine;
pub mod labels;
pub mod plan;
pub mod report;

#[cfg(test)]
mod testing;

pub use engine::{
    Engine, EngineSettings, DEFAULT_ACTION_NEEDED_LABEL, DEFAULT_FINISHED_LABEL,
    DEFAULT_PROGRESS_COMMENT,
};
pub use labels::{LabelCache, ResolvedLabels};
pub use plan::{plan, Transition};
pub use report::{BestEffortFailure, CycleReport, TransitionOutcome};
