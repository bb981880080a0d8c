//! Bounded-retry publish orchestrator
//!
//! # Commit protocol
//!
//! ```text
//! actuate (≤ max_attempts) ──success──▶ phase 1: record success,
//!                          │                     register pending move, save
//!                          │            phase 2: move pending → consumed,
//!                          │                     clear pending move, save
//!                          └─exhausted─▶ record one failure, save
//! ```
//!
//! Outstanding pending moves are replayed before every cycle, so a crash
//! between the phases neither republishes the item nor moves it twice.
//!
//! Phase 1 also hands the item's link to [`harvest::mark_reference_used`];
//! the harvest state is never written here directly.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::Actuator;
use crate::error::Result;
use crate::harvest::{self, ReferenceExtractor};
use crate::models::{Category, ContentItem, Outcome, Payload, PublicationRecord, RenderedContent};
use crate::storage::backlog::{ContentSource, MoveOutcome};
use crate::storage::registry::RegistryStore;
use crate::storage::state::RegistryState;
use crate::utils::clock::Clock;
use crate::utils::error::SourceError;
use crate::utils::retry::{with_retry, RetryConfig};

/// Result of one orchestrated publication
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Published; `moved` is `None` when relocation is left for replay
    Published {
        record: PublicationRecord,
        moved: Option<MoveOutcome>,
    },
    /// Every attempt failed
    Failed { record: PublicationRecord },
}

impl PublishOutcome {
    pub fn record(&self) -> &PublicationRecord {
        match self {
            Self::Published { record, .. } | Self::Failed { record } => record,
        }
    }
}

/// Drives the actuator and commits the outcome
pub struct PublishOrchestrator {
    actuator: Arc<dyn Actuator>,
    retry: RetryConfig,
    window_capacity: usize,
    normalizer: Option<ReferenceExtractor>,
}

impl PublishOrchestrator {
    pub fn new(actuator: Arc<dyn Actuator>, retry: RetryConfig, window_capacity: usize) -> Self {
        Self {
            actuator,
            retry,
            window_capacity,
            normalizer: None,
        }
    }

    /// Mark published secondary references as used
    pub fn with_reference_normalizer(mut self, normalizer: ReferenceExtractor) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Publish `item` and persist the outcome
    ///
    /// # Errors
    ///
    /// Only registry saves fail this call. Actuation failures are recorded
    /// and returned as [`PublishOutcome::Failed`].
    pub async fn publish(
        &self,
        item: &ContentItem,
        rendered: &RenderedContent,
        state: &mut RegistryState,
        store: &RegistryStore,
        content: &dyn ContentSource,
        clock: &dyn Clock,
    ) -> Result<PublishOutcome> {
        info!(
            item = %item.id,
            category = %item.category,
            actuator = self.actuator.name(),
            max_attempts = self.retry.max_attempts,
            "Publishing"
        );

        let outcome = with_retry(&self.retry, |attempt| {
            debug!(item = %item.id, attempt = attempt, "Actuation attempt");
            self.actuator.publish(rendered)
        })
        .await;

        let now = clock.now();
        let duration_ms = outcome.elapsed.as_millis() as u64;

        match outcome.result {
            Ok(()) => {
                let record = PublicationRecord::new(
                    now,
                    item,
                    Outcome::Success,
                    outcome.attempts,
                    duration_ms,
                );

                // phase 1
                state.record_success(record.clone(), self.window_capacity);
                if item.category == Category::Secondary {
                    self.mark_reference_used(item, state);
                    state.register_pending_move(&item.id, now);
                }
                store.save(state)?;

                info!(
                    item = %item.id,
                    category = %item.category,
                    attempts = outcome.attempts,
                    duration_ms = duration_ms,
                    "Published"
                );

                // phase 2
                let moved = if item.category == Category::Secondary {
                    self.complete_move(&item.id, state, store, content)?
                } else {
                    None
                };

                Ok(PublishOutcome::Published { record, moved })
            }
            Err(e) => {
                let record = PublicationRecord::new(
                    now,
                    item,
                    Outcome::Failure,
                    outcome.attempts,
                    duration_ms,
                )
                .with_error(e.to_string());

                state.record_failure(record.clone());
                store.save(state)?;

                error!(
                    item = %item.id,
                    category = %item.category,
                    attempts = outcome.attempts,
                    error = %e,
                    "Publication failed after all attempts"
                );

                Ok(PublishOutcome::Failed { record })
            }
        }
    }

    /// Replay relocations left over from an interrupted cycle
    ///
    /// Returns how many pending moves were resolved.
    pub fn replay_pending_moves(
        &self,
        state: &mut RegistryState,
        store: &RegistryStore,
        content: &dyn ContentSource,
    ) -> Result<usize> {
        let ids: Vec<String> = state.pending_moves.iter().map(|m| m.item_id.clone()).collect();
        let mut resolved = 0;

        for id in ids {
            if self.complete_move(&id, state, store, content)?.is_some() {
                resolved += 1;
            }
        }

        if resolved > 0 {
            info!(resolved = resolved, "Replayed pending moves");
        }
        Ok(resolved)
    }

    /// Phase 2 of the commit: idempotent relocation
    fn complete_move(
        &self,
        id: &str,
        state: &mut RegistryState,
        store: &RegistryStore,
        content: &dyn ContentSource,
    ) -> Result<Option<MoveOutcome>> {
        let moved = match content.move_to_consumed(id) {
            Ok(moved) => moved,
            Err(SourceError::ItemNotFound(_)) => {
                warn!(item = id, "Item vanished from both folders, dropping pending move");
                MoveOutcome::AlreadyConsumed
            }
            Err(e) => {
                warn!(item = id, error = %e, "Relocation failed, will replay next cycle");
                return Ok(None);
            }
        };

        state.clear_pending_move(id);
        store.save(state)?;
        Ok(Some(moved))
    }

    fn mark_reference_used(&self, item: &ContentItem, state: &mut RegistryState) {
        if let (Some(normalizer), Payload::Link { reference, .. }) = (&self.normalizer, &item.payload)
        {
            harvest::mark_reference_used(normalizer, reference, &mut state.harvest);
        }
    }
}
