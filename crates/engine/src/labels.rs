//! Lazily resolved label ids.
//!
//! Label ids are looked up by name the first time a cycle needs them and kept
//! for the rest of the process. They are never persisted. A failed lookup is
//! not cached, so the next cycle tries again.

use bridge::{BoardError, BoardGateway, LabelId, LabelName};
use tracing::info;

/// The two label ids every card operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLabels {
    pub action_needed: LabelId,
    pub finished: LabelId,
}

/// Resolve-once cache for [`ResolvedLabels`].
#[derive(Debug, Clone)]
pub struct LabelCache {
    action_needed: LabelName,
    finished: LabelName,
    resolved: Option<ResolvedLabels>,
}

impl LabelCache {
    pub fn new(action_needed: LabelName, finished: LabelName) -> Self {
        Self {
            action_needed,
            finished,
            resolved: None,
        }
    }

    /// Returns the cached ids, resolving both labels on first use.
    ///
    /// Both labels must resolve; a partial result is discarded.
    pub async fn get(&mut self, board: &dyn BoardGateway) -> Result<ResolvedLabels, BoardError> {
        if let Some(resolved) = self.resolved {
            return Ok(resolved);
        }

        let resolved = ResolvedLabels {
            action_needed: board.resolve_label(&self.action_needed).await?,
            finished: board.resolve_label(&self.finished).await?,
        };
        info!(
            action_needed = %resolved.action_needed,
            finished = %resolved.finished,
            "Resolved board labels"
        );
        self.resolved = Some(resolved);
        Ok(resolved)
    }
}
