//! The reconciliation engine.
//!
//! One call to [`Engine::run_cycle`] performs one polling cycle:
//!
//! 1. Load the mapping. A corrupt mapping aborts the cycle.
//! 2. List offenses. A source failure aborts the cycle before anything is
//!    written.
//! 3. [`plan`] the transitions. Nothing to do means no board calls at all.
//! 4. Resolve labels (cached after the first success). If they cannot be
//!    resolved every transition fails and is retried next cycle.
//! 5. Execute each transition. A board failure abandons only that offense's
//!    transition; a store failure aborts the cycle.
//!
//! Mapping writes always follow the board write they describe, so a crash can
//! leave an untracked card but never an entry pointing at nothing. Untracked
//! cards are adopted by title on the next cycle when `adopt_orphans` is on.

use std::collections::HashMap;
use std::sync::Arc;

use bridge::{
    card, BoardGateway, BridgeError, CardId, CycleId, ErrorClass, LabelName, MappingStore,
    Offense, OffenseId, SourceGateway, StackId, Timestamp,
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::labels::{LabelCache, ResolvedLabels};
use crate::plan::{plan, Transition};
use crate::report::{BestEffortFailure, CycleReport, TransitionOutcome};

/// Default progress comment posted on every new card.
pub const DEFAULT_PROGRESS_COMMENT: &str =
    "Working on progress... Will update you with the results";

/// Default title of the label marking cards that need an analyst.
pub const DEFAULT_ACTION_NEEDED_LABEL: &str = "Action needed";

/// Default title of the label marking finished cards.
pub const DEFAULT_FINISHED_LABEL: &str = "Finished";

/// Board layout and card rules for one engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Stack that holds cards for open offenses.
    pub active_stack: StackId,
    /// Stack that receives archive copies.
    pub archive_stack: StackId,
    pub action_needed_label: LabelName,
    pub finished_label: LabelName,
    /// Due date offset for new cards.
    pub due_in_hours: u32,
    pub progress_comment: String,
    /// Adopt untracked active-stack cards titled for an offense instead of
    /// creating duplicates.
    pub adopt_orphans: bool,
}

impl EngineSettings {
    /// Settings with the stock card rules and the given label names.
    pub fn new(
        active_stack: StackId,
        archive_stack: StackId,
        action_needed_label: LabelName,
        finished_label: LabelName,
    ) -> Self {
        Self {
            active_stack,
            archive_stack,
            action_needed_label,
            finished_label,
            due_in_hours: 5,
            progress_comment: DEFAULT_PROGRESS_COMMENT.to_string(),
            adopt_orphans: true,
        }
    }
}

/// Result of executing a single transition.
enum Step {
    Done(TransitionOutcome),
    /// The cycle must stop; earlier transitions stay committed.
    Abort(BridgeError),
}

/// Drives offense → card reconciliation against the three ports.
pub struct Engine {
    source: Arc<dyn SourceGateway>,
    board: Arc<dyn BoardGateway>,
    store: Arc<dyn MappingStore>,
    settings: EngineSettings,
    labels: LabelCache,
}

impl Engine {
    pub fn new(
        source: Arc<dyn SourceGateway>,
        board: Arc<dyn BoardGateway>,
        store: Arc<dyn MappingStore>,
        settings: EngineSettings,
    ) -> Self {
        let labels = LabelCache::new(
            settings.action_needed_label.clone(),
            settings.finished_label.clone(),
        );
        Self {
            source,
            board,
            store,
            settings,
            labels,
        }
    }

    /// Runs one reconciliation cycle.
    ///
    /// `Err` means the cycle was abandoned (source down, store unreadable or
    /// unwritable). Per-offense failures are reported in the returned
    /// [`CycleReport`] instead.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, BridgeError> {
        let cycle_id = CycleId::new_random();
        let span = info_span!("cycle", cycle_id = %cycle_id);
        self.run_cycle_inner(cycle_id).instrument(span).await
    }

    async fn run_cycle_inner(&mut self, cycle_id: CycleId) -> Result<CycleReport, BridgeError> {
        let mapping = self.store.load()?;
        let offenses = self.source.list_offenses().await?;
        let transitions = plan(&mapping, &offenses);

        let mut report = CycleReport::new(cycle_id, offenses.len());
        debug!(
            offenses = offenses.len(),
            tracked = mapping.live_entries().count(),
            transitions = transitions.len(),
            "Planned cycle"
        );
        if transitions.is_empty() {
            return Ok(report);
        }

        let labels = match self.labels.get(self.board.as_ref()).await {
            Ok(labels) => labels,
            Err(e) => {
                error!(error = %e, "Label resolution failed; no cards will be touched this cycle");
                for transition in &transitions {
                    report.outcomes.push(TransitionOutcome::Failed {
                        offense: transition.offense_id(),
                        class: e.class(),
                        message: e.to_string(),
                    });
                }
                return Ok(report);
            }
        };

        let orphans = self.find_orphans(&transitions).await;

        for transition in transitions {
            let step = match transition {
                Transition::Create(offense) => {
                    let span = info_span!("create", offense_id = %offense.id);
                    self.create(&offense, labels, &orphans, &mut report)
                        .instrument(span)
                        .await
                }
                Transition::Archive { offense, card } => {
                    let span = info_span!("archive", offense_id = %offense, card_id = %card);
                    self.archive(offense, card, labels, &mut report)
                        .instrument(span)
                        .await
                }
            };
            match step {
                Step::Done(outcome) => report.outcomes.push(outcome),
                Step::Abort(e) => {
                    error!(error = %e, "Cycle abandoned");
                    return Err(e);
                }
            }
        }

        info!(
            created = report.created(),
            adopted = report.adopted(),
            archived = report.archived(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Maps offense ids to untracked active-stack cards titled for them.
    ///
    /// Returns `Err` (as a map-level failure) when the stack cannot be listed,
    /// in which case creations are held back for this cycle.
    async fn find_orphans(
        &self,
        transitions: &[Transition],
    ) -> Result<HashMap<OffenseId, CardId>, String> {
        let wants_create = transitions
            .iter()
            .any(|t| matches!(t, Transition::Create(_)));
        if !self.settings.adopt_orphans || !wants_create {
            return Ok(HashMap::new());
        }

        match self.board.list_cards(self.settings.active_stack).await {
            Ok(cards) => Ok(cards
                .into_iter()
                .filter_map(|c| card::parse_card_title(&c.title).map(|offense| (offense, c.id)))
                .collect()),
            Err(e) => {
                warn!(error = %e, "Could not list active stack; holding back card creation");
                Err(e.to_string())
            }
        }
    }

    /// `UNSEEN → TRACKED`.
    async fn create(
        &self,
        offense: &Offense,
        labels: ResolvedLabels,
        orphans: &Result<HashMap<OffenseId, CardId>, String>,
        report: &mut CycleReport,
    ) -> Step {
        let orphans = match orphans {
            Ok(orphans) => orphans,
            Err(message) => {
                return Step::Done(TransitionOutcome::Failed {
                    offense: offense.id,
                    class: ErrorClass::BoardUnavailable,
                    message: format!("active stack listing failed: {message}"),
                })
            }
        };

        let (card, adopted) = match orphans.get(&offense.id) {
            Some(card) => (*card, true),
            None => {
                let spec = card::tracking_card(
                    offense,
                    vec![labels.action_needed, labels.finished],
                    Timestamp::now(),
                    self.settings.due_in_hours,
                );
                match self
                    .board
                    .create_card(self.settings.active_stack, &spec)
                    .await
                {
                    Ok(card) => (card, false),
                    Err(e) => {
                        warn!(error = %e, "Card creation failed");
                        return Step::Done(TransitionOutcome::Failed {
                            offense: offense.id,
                            class: e.class(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        };

        if let Err(e) = self.store.record(offense.id, card) {
            return Step::Abort(e.into());
        }
        if adopted {
            info!(card_id = %card, "Adopted untracked card");
        } else {
            info!(card_id = %card, "Created card");
        }

        self.enrich(offense, card, report).await;

        Step::Done(if adopted {
            TransitionOutcome::Adopted {
                offense: offense.id,
                card,
            }
        } else {
            TransitionOutcome::Created {
                offense: offense.id,
                card,
            }
        })
    }

    /// Best-effort comment and assignment on a freshly tracked card.
    async fn enrich(&self, offense: &Offense, card: CardId, report: &mut CycleReport) {
        if let Err(e) = self
            .board
            .add_comment(card, &self.settings.progress_comment)
            .await
        {
            warn!(card_id = %card, error = %e, "Could not add progress comment");
            report.best_effort_failures.push(BestEffortFailure {
                offense: offense.id,
                card,
                operation: "add_comment",
                message: e.to_string(),
            });
        }

        let Some(owner) = &offense.assigned_to else {
            return;
        };
        if let Err(e) = self
            .board
            .assign_user(self.settings.active_stack, card, owner)
            .await
        {
            warn!(card_id = %card, user = %owner, error = %e, "Could not assign owner");
            report.best_effort_failures.push(BestEffortFailure {
                offense: offense.id,
                card,
                operation: "assign_user",
                message: e.to_string(),
            });
        }
    }

    /// `TRACKED → ARCHIVED`.
    async fn archive(
        &self,
        offense: OffenseId,
        card: CardId,
        labels: ResolvedLabels,
        report: &mut CycleReport,
    ) -> Step {
        let snapshot = match self.board.get_card(self.settings.active_stack, card).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Could not read tracked card");
                return Step::Done(TransitionOutcome::Failed {
                    offense,
                    class: e.class(),
                    message: e.to_string(),
                });
            }
        };

        let notes = match self.source.list_notes(offense).await {
            Ok(notes) => notes,
            Err(e) if e.is_offense_deleted() => {
                info!("Offense already deleted on the source; skipping archive this cycle");
                return Step::Done(TransitionOutcome::Skipped {
                    offense,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Step::Abort(e.into()),
        };

        let spec = card::archive_card(&snapshot, &notes, labels.finished);
        let archive = match self
            .board
            .create_card(self.settings.archive_stack, &spec)
            .await
        {
            Ok(archive) => archive,
            Err(e) => {
                warn!(error = %e, "Archive copy creation failed");
                return Step::Done(TransitionOutcome::Failed {
                    offense,
                    class: e.class(),
                    message: e.to_string(),
                });
            }
        };

        if let Err(e) = self.store.tombstone(offense) {
            return Step::Abort(e.into());
        }
        info!(archive_card_id = %archive, "Archived card");

        if let Err(e) = self
            .board
            .delete_card(self.settings.active_stack, card)
            .await
        {
            warn!(error = %e, "Original card could not be deleted after archiving");
            report.best_effort_failures.push(BestEffortFailure {
                offense,
                card,
                operation: "delete_card",
                message: e.to_string(),
            });
        }

        Step::Done(TransitionOutcome::Archived {
            offense,
            original: card,
            archive,
        })
    }
}
