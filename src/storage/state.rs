//! Registry state types
//!
//! Everything the scheduler remembers between invocations lives in one
//! [`RegistryState`] document: the publication history, rotation and harvest
//! cursors, the rate gate, the alternation cursor, aggregate statistics and
//! outstanding two-phase-commit moves.
//!
//! # Schema versions
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | history, rotation, harvest, rate gate |
//! | 2 | alternation cursor, statistics, pending moves, harvest events |
//!
//! [`RegistryState::migrate`] upgrades any older document in place and is
//! idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Category, PublicationRecord};
use crate::scheduler::{advance_gate, push_recent};

/// Current registry schema version
pub const SCHEMA_VERSION: u32 = 2;

// ============================================================================
// Sections
// ============================================================================

/// Recent window and sequential cursor for primary items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationState {
    /// Last N primary ids, oldest first
    pub recent: Vec<String>,

    /// Last primary id published (sequential cursor)
    pub last_primary: Option<String>,
}

/// One completed harvest session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub source_id: String,
    pub quantity: usize,
    pub first_number: Option<u32>,
    pub last_number: Option<u32>,
    pub stop_reason: String,
}

/// Harvest counters and the used-reference set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestState {
    /// Next number assigned to a secondary item (monotonic)
    pub next_number: u32,

    /// Normalized references that were already accepted
    pub used_references: BTreeSet<String>,

    /// Items accepted over all sessions
    pub total_harvested: u64,

    pub last_harvest_at: Option<DateTime<Utc>>,

    pub events: Vec<HarvestEvent>,
}

impl Default for HarvestState {
    fn default() -> Self {
        Self {
            next_number: 1,
            used_references: BTreeSet::new(),
            total_harvested: 0,
            last_harvest_at: None,
            events: Vec::new(),
        }
    }
}

/// Timestamp of the last successful publish of any category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateGate {
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Category of the last successful publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternationCursor {
    pub last_category: Option<Category>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Aggregate publication statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationStats {
    pub successes: u64,
    pub failures: u64,

    /// Attempts summed over successful cycles
    pub total_attempts: u64,

    /// Running mean duration of successful cycles
    pub mean_duration_ms: f64,

    pub primary_published: u64,
    pub secondary_published: u64,

    /// Publish count per primary id
    pub per_item: BTreeMap<String, u64>,

    pub most_published: Option<String>,

    /// Last cycle of any outcome
    pub last_run_at: Option<DateTime<Utc>>,
}

impl PublicationStats {
    /// Rebuild statistics from a history
    pub fn from_history(history: &[PublicationRecord]) -> Self {
        let mut stats = Self::default();
        for record in history {
            stats.observe(record);
        }
        stats
    }

    /// Fold one record into the statistics
    pub fn observe(&mut self, record: &PublicationRecord) {
        self.last_run_at = Some(match self.last_run_at {
            Some(prev) if prev > record.timestamp => prev,
            _ => record.timestamp,
        });

        if !record.is_success() {
            self.failures += 1;
            return;
        }

        self.successes += 1;
        self.total_attempts += u64::from(record.attempts);
        self.mean_duration_ms +=
            (record.duration_ms as f64 - self.mean_duration_ms) / self.successes as f64;

        match record.category {
            Category::Primary => {
                self.primary_published += 1;
                *self.per_item.entry(record.item_id.clone()).or_insert(0) += 1;
                self.refresh_most_published();
            }
            Category::Secondary => self.secondary_published += 1,
        }
    }

    fn refresh_most_published(&mut self) {
        let mut best: Option<(&String, u64)> = None;
        for (id, &count) in &self.per_item {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((id, count));
            }
        }
        self.most_published = best.map(|(id, _)| id.clone());
    }

    /// Successful share of all cycles in percent
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            0.0
        } else {
            self.successes as f64 / total as f64 * 100.0
        }
    }

    /// Mean attempts per successful publish
    pub fn mean_attempts(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.total_attempts as f64 / self.successes as f64
        }
    }
}

/// Secondary item committed as published but not yet relocated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    pub item_id: String,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Registry State
// ============================================================================

/// The whole persisted registry document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryState {
    pub schema_version: u32,
    pub history: Vec<PublicationRecord>,
    pub rotation: RotationState,
    pub harvest: HarvestState,
    pub rate_gate: RateGate,
    pub alternation: AlternationCursor,
    pub stats: PublicationStats,
    pub pending_moves: Vec<PendingMove>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            history: Vec::new(),
            rotation: RotationState::default(),
            harvest: HarvestState::default(),
            rate_gate: RateGate::default(),
            alternation: AlternationCursor::default(),
            stats: PublicationStats::default(),
            pending_moves: Vec::new(),
        }
    }
}

impl RegistryState {
    /// Fresh, empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring an older document up to [`SCHEMA_VERSION`]
    ///
    /// Fills what older versions did not store, derived from the data that is
    /// present. Running it twice yields the same state.
    pub fn migrate(mut self) -> Self {
        if self.harvest.next_number == 0 {
            self.harvest.next_number = 1;
        }

        let mut seen = BTreeSet::new();
        self.rotation.recent.retain(|id| seen.insert(id.clone()));

        if self.stats.successes + self.stats.failures == 0 && !self.history.is_empty() {
            self.stats = PublicationStats::from_history(&self.history);
        }

        if self.alternation.last_category.is_none() {
            if let Some(last) = self.history.iter().rev().find(|r| r.is_success()) {
                self.alternation.last_category = Some(last.category);
                self.alternation.updated_at = Some(last.timestamp);
            }
        }

        if self.rate_gate.last_success_at.is_none() {
            self.rate_gate.last_success_at = self
                .history
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.timestamp)
                .max();
        }

        let mut pending = BTreeSet::new();
        self.pending_moves.retain(|m| pending.insert(m.item_id.clone()));

        self.schema_version = SCHEMA_VERSION;
        self
    }

    /// Apply a successful publish
    ///
    /// Appends the record and updates the rate gate, alternation cursor,
    /// statistics and, for primary items, the rotation state, all in one
    /// mutation.
    pub fn record_success(&mut self, record: PublicationRecord, window_capacity: usize) {
        self.rate_gate.last_success_at =
            Some(advance_gate(self.rate_gate.last_success_at, record.timestamp));

        self.alternation.last_category = Some(record.category);
        self.alternation.updated_at = Some(record.timestamp);

        if record.category == Category::Primary {
            push_recent(&mut self.rotation.recent, &record.item_id, window_capacity);
            self.rotation.last_primary = Some(record.item_id.clone());
        }

        self.stats.observe(&record);
        self.history.push(record);
    }

    /// Apply an exhausted publish
    pub fn record_failure(&mut self, record: PublicationRecord) {
        self.stats.observe(&record);
        self.history.push(record);
    }

    /// Register a relocation that still has to happen
    pub fn register_pending_move(&mut self, item_id: &str, at: DateTime<Utc>) {
        if !self.pending_moves.iter().any(|m| m.item_id == item_id) {
            self.pending_moves.push(PendingMove {
                item_id: item_id.to_string(),
                recorded_at: at,
            });
        }
    }

    /// Forget a relocation once it happened
    pub fn clear_pending_move(&mut self, item_id: &str) {
        self.pending_moves.retain(|m| m.item_id != item_id);
    }

    /// Whether a reference was already harvested
    pub fn is_reference_used(&self, normalized: &str) -> bool {
        self.harvest.used_references.contains(normalized)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Forget the recent window only
    pub fn reset_recent_window(&mut self) {
        self.rotation.recent.clear();
    }

    /// Forget used references and harvest events
    ///
    /// The next-number counter is kept so new items never reuse a number.
    pub fn reset_harvest_cursor(&mut self) {
        self.harvest.used_references.clear();
        self.harvest.events.clear();
        self.harvest.last_harvest_at = None;
    }

    /// Clear history and everything derived from it, keeping harvest state
    pub fn reset_history(&mut self) {
        self.history.clear();
        self.stats = PublicationStats::default();
        self.rotation = RotationState::default();
        self.alternation = AlternationCursor::default();
        self.rate_gate = RateGate::default();
    }

    /// Snapshot for the statistics view
    pub fn summary(&self) -> StatsSummary {
        let most_published = self.stats.most_published.as_ref().map(|id| {
            let count = self.stats.per_item.get(id).copied().unwrap_or(0);
            (id.clone(), count)
        });

        StatsSummary {
            total_cycles: self.stats.successes + self.stats.failures,
            successes: self.stats.successes,
            failures: self.stats.failures,
            success_rate: self.stats.success_rate(),
            mean_attempts: self.stats.mean_attempts(),
            mean_duration_ms: self.stats.mean_duration_ms,
            primary_published: self.stats.primary_published,
            secondary_published: self.stats.secondary_published,
            most_published,
            recent_window: self.rotation.recent.clone(),
            last_success_at: self.rate_gate.last_success_at,
            last_category: self.alternation.last_category,
            used_references: self.harvest.used_references.len(),
            total_harvested: self.harvest.total_harvested,
            next_number: self.harvest.next_number,
            pending_moves: self.pending_moves.len(),
        }
    }
}

/// Read-only statistics view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_cycles: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
    pub mean_attempts: f64,
    pub mean_duration_ms: f64,
    pub primary_published: u64,
    pub secondary_published: u64,
    pub most_published: Option<(String, u64)>,
    pub recent_window: Vec<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_category: Option<Category>,
    pub used_references: usize,
    pub total_harvested: u64,
    pub next_number: u32,
    pub pending_moves: usize,
}
