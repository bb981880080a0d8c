//! Harvest loop
//!
//! Each step fetches the visible batch and classifies every candidate:
//!
//! ```text
//! candidate ──▶ no whitelisted link ──▶ ignored
//!          └──▶ reference used before ──▶ skipped (already used)
//!          └──▶ seen this session    ──▶ skipped (session duplicate)
//!          └──▶ new                  ──▶ accepted, next number assigned
//! ```
//!
//! A step that accepts nothing increments the stall counter; any accepting
//! step resets it.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use super::reference::ReferenceExtractor;
use super::{HarvestSession, HarvestSource};
use crate::storage::backlog::ContentSource;
use crate::storage::state::{HarvestEvent, HarvestState};
use crate::utils::error::HarvestError;

/// Termination limits for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestLimits {
    /// Target size of the pending backlog
    pub quota: usize,

    /// Consecutive steps without a new item before stopping
    pub stall_limit: u32,

    /// Absolute number of steps
    pub max_steps: u32,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            quota: 10,
            stall_limit: 3,
            max_steps: 50,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Pending backlog plus accepted items reached the quota
    QuotaReached,
    /// Too many consecutive steps without a new item
    Stalled,
    /// Step ceiling reached
    StepCeiling,
    /// Source failed after the first step
    SourceFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaReached => write!(f, "quota reached"),
            Self::Stalled => write!(f, "stalled"),
            Self::StepCeiling => write!(f, "step ceiling"),
            Self::SourceFailed(reason) => write!(f, "source failed: {reason}"),
        }
    }
}

/// Item accepted during a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedItem {
    pub number: u32,
    pub reference: String,
    pub normalized: String,
    pub caption: Vec<String>,
}

/// Summary of one harvest session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub session_id: String,
    pub steps: u32,
    pub accepted: Vec<AcceptedItem>,
    pub stored_ids: Vec<String>,
    pub already_used: usize,
    pub session_duplicates: usize,
    pub ignored: usize,
    pub pending_before: usize,
    pub stop_reason: StopReason,
}

impl HarvestReport {
    /// Number of items added to the backlog
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

/// Runs harvest sessions
pub struct HarvestEngine {
    extractor: ReferenceExtractor,
    limits: HarvestLimits,
}

impl HarvestEngine {
    pub fn new(extractor: ReferenceExtractor, limits: HarvestLimits) -> Self {
        Self { extractor, limits }
    }

    pub fn limits(&self) -> HarvestLimits {
        self.limits
    }

    /// Harvest until a stop condition fires, then store accepted items
    ///
    /// Accepted items are written to the pending backlog before `state` is
    /// updated; the caller persists `state` afterwards.
    ///
    /// # Errors
    ///
    /// Fails when the first fetch fails or a backlog write fails. Later fetch
    /// failures end the session with [`StopReason::SourceFailed`].
    pub async fn run(
        &self,
        source: &mut dyn HarvestSource,
        content: &dyn ContentSource,
        state: &mut HarvestState,
        now: DateTime<Utc>,
    ) -> Result<HarvestReport, HarvestError> {
        let session = HarvestSession::new(source.source_id(), now);
        let pending_before = content.pending_count()?;
        let mut next_number = state
            .next_number
            .max(content.highest_secondary_number()?.saturating_add(1));

        info!(
            session = %session.id,
            source = %session.source_id,
            pending = pending_before,
            quota = self.limits.quota,
            "Harvest session started"
        );

        let mut report = HarvestReport {
            session_id: session.id.to_string(),
            steps: 0,
            accepted: Vec::new(),
            stored_ids: Vec::new(),
            already_used: 0,
            session_duplicates: 0,
            ignored: 0,
            pending_before,
            stop_reason: StopReason::QuotaReached,
        };

        if pending_before >= self.limits.quota {
            info!(pending = pending_before, "Backlog already at quota");
            return Ok(report);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut stall = 0u32;

        report.stop_reason = 'steps: loop {
            report.steps += 1;

            let batch = match source.fetch_next_batch(&session).await {
                Ok(batch) => batch,
                Err(e) if report.steps == 1 => return Err(e),
                Err(e) => {
                    warn!(step = report.steps, error = %e, "Harvest fetch failed");
                    break StopReason::SourceFailed(e.to_string());
                }
            };

            let mut accepted_this_step = 0;
            for candidate in &batch {
                let Some(found) = self.extractor.extract(&candidate.text) else {
                    report.ignored += 1;
                    continue;
                };

                if state.used_references.contains(&found.normalized) {
                    report.already_used += 1;
                    continue;
                }
                if !seen.insert(found.normalized.clone()) {
                    report.session_duplicates += 1;
                    continue;
                }

                debug!(number = next_number, reference = %found.url, "Accepted candidate");
                report.accepted.push(AcceptedItem {
                    number: next_number,
                    reference: found.url,
                    normalized: found.normalized,
                    caption: found.caption,
                });
                next_number += 1;
                accepted_this_step += 1;

                if pending_before + report.accepted.len() >= self.limits.quota {
                    break 'steps StopReason::QuotaReached;
                }
            }

            debug!(
                step = report.steps,
                batch = batch.len(),
                accepted = accepted_this_step,
                "Harvest step finished"
            );

            if accepted_this_step == 0 {
                stall += 1;
            } else {
                stall = 0;
            }

            if stall >= self.limits.stall_limit {
                break StopReason::Stalled;
            }
            if report.steps >= self.limits.max_steps {
                break StopReason::StepCeiling;
            }
        };

        for item in &report.accepted {
            let id = content.write_pending(item.number, &item.reference, &item.caption)?;
            report.stored_ids.push(id);
        }

        for item in &report.accepted {
            state.used_references.insert(item.normalized.clone());
        }
        state.next_number = next_number;
        state.total_harvested += report.accepted.len() as u64;
        state.last_harvest_at = Some(now);
        state.events.push(HarvestEvent {
            timestamp: now,
            session_id: report.session_id.clone(),
            source_id: session.source_id.clone(),
            quantity: report.accepted.len(),
            first_number: report.accepted.first().map(|i| i.number),
            last_number: report.accepted.last().map(|i| i.number),
            stop_reason: report.stop_reason.to_string(),
        });

        info!(
            session = %session.id,
            accepted = report.accepted.len(),
            steps = report.steps,
            already_used = report.already_used,
            ignored = report.ignored,
            stop = %report.stop_reason,
            "Harvest session finished"
        );

        Ok(report)
    }
}

/// Record the link of a published secondary item as used
///
/// Items dropped into the pending folder by hand never went through a
/// session, so their links are only learned here. Returns whether the set
/// grew; links that do not normalize are ignored.
pub fn mark_reference_used(
    extractor: &ReferenceExtractor,
    reference: &str,
    state: &mut HarvestState,
) -> bool {
    match extractor.normalize(reference) {
        Some(normalized) => state.used_references.insert(normalized),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WHITELIST;

    #[test]
    fn test_mark_reference_used_normalizes() {
        let extractor = ReferenceExtractor::new(DEFAULT_WHITELIST);
        let mut state = HarvestState::default();

        assert!(mark_reference_used(
            &extractor,
            "https://www.youtube.com/watch?v=abc&utm_source=chat",
            &mut state
        ));
        assert!(!mark_reference_used(
            &extractor,
            "https://youtube.com/watch?v=abc",
            &mut state
        ));
        assert_eq!(state.used_references.len(), 1);
        assert_eq!(state.next_number, HarvestState::default().next_number);
    }

    #[test]
    fn test_mark_reference_used_ignores_foreign_links() {
        let extractor = ReferenceExtractor::new(DEFAULT_WHITELIST);
        let mut state = HarvestState::default();

        assert!(!mark_reference_used(&extractor, "https://example.com/a", &mut state));
        assert!(!mark_reference_used(&extractor, "not a link", &mut state));
        assert!(state.used_references.is_empty());
    }
}
