//! One publish cycle, end to end
//!
//! ```text
//! load registry ─▶ replay pending moves ─▶ rate gate ─▶ alternation gate
//!      ─▶ select item ─▶ render ─▶ orchestrate ─▶ commit ─▶ replenish backlog
//! ```
//!
//! Only configuration errors escape [`PublishCycle::run_cycle`]; every other
//! failure is logged and reported as [`CycleReport::Skipped`].

use chrono::Duration;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, ErrorCategory, HomilyErrorTrait, Result};
use crate::harvest::{
    ChatExportSource, HarvestEngine, HarvestLimits, HarvestReport, HarvestSource,
    ReferenceExtractor,
};
use crate::models::{Category, ContentItem};
use crate::publisher::{Actuator, CommandActuator, PublishOrchestrator, PublishOutcome};
use crate::render::Renderer;
use crate::scheduler::{
    AlternationGate, RateLimiter, RotationSelector, SchedulerError,
};
use crate::storage::{ContentSource, FsContentSource, RegistryState, RegistryStore};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::error::SourceError;
use crate::utils::format_seconds;
use crate::utils::retry::RetryConfig;

// ============================================================================
// Cycle Report
// ============================================================================

/// What a cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Item published
    Published {
        item_id: String,
        category: Category,
        attempts: u32,
        forced: bool,
        harvested: Option<usize>,
    },
    /// Every attempt failed; a failure record was written
    Failed {
        item_id: String,
        category: Category,
        attempts: u32,
        error: Option<String>,
    },
    /// Minimum interval not yet elapsed
    RateLimited {
        remaining: Duration,
        explanation: String,
    },
    /// No item available in the chosen category
    NothingToPublish { category: Category },
    /// Non-fatal error, cycle abandoned
    Skipped {
        category: ErrorCategory,
        reason: String,
    },
}

impl CycleReport {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published {
                item_id,
                category,
                attempts,
                forced,
                harvested,
            } => {
                write!(f, "published {category} item {item_id} after {attempts} attempt(s)")?;
                if *forced {
                    write!(f, " (forced)")?;
                }
                if let Some(n) = harvested {
                    write!(f, ", harvested {n} new item(s)")?;
                }
                Ok(())
            }
            Self::Failed {
                item_id,
                attempts,
                error,
                ..
            } => {
                write!(f, "failed to publish {item_id} after {attempts} attempt(s)")?;
                if let Some(e) = error {
                    write!(f, ": {e}")?;
                }
                Ok(())
            }
            Self::RateLimited { explanation, .. } => write!(f, "rate limited: {explanation}"),
            Self::NothingToPublish { category } => write!(f, "nothing to publish ({category})"),
            Self::Skipped { category, reason } => write!(f, "skipped ({category}): {reason}"),
        }
    }
}

// ============================================================================
// Replenisher
// ============================================================================

/// Harvest engine bound to its source
pub struct Replenisher {
    engine: HarvestEngine,
    source: Box<dyn HarvestSource>,
    low_water: usize,
}

impl Replenisher {
    pub fn new(engine: HarvestEngine, source: Box<dyn HarvestSource>, low_water: usize) -> Self {
        Self {
            engine,
            source,
            low_water,
        }
    }

    /// Build from configuration; `None` when no harvest source is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        let path = config.harvest.source_path.as_ref()?;
        let source = ChatExportSource::new(
            path,
            config.harvest.source_id.clone(),
            config.harvest.window_size,
        )
        .with_author(config.harvest.author.clone());

        Some(Self::new(
            harvest_engine(config),
            Box::new(source),
            config.harvest.low_water,
        ))
    }

    /// Whether a backlog of `pending` items should be refilled
    pub fn needs_replenish(&self, pending: usize) -> bool {
        pending < self.low_water
    }

    /// Run one harvest session into `state` (not persisted)
    pub async fn run(
        &mut self,
        state: &mut RegistryState,
        content: &dyn ContentSource,
        clock: &dyn Clock,
    ) -> Result<HarvestReport> {
        let report = self
            .engine
            .run(self.source.as_mut(), content, &mut state.harvest, clock.now())
            .await?;
        Ok(report)
    }
}

/// Harvest engine configured from `config`
pub fn harvest_engine(config: &Config) -> HarvestEngine {
    HarvestEngine::new(
        ReferenceExtractor::new(config.harvest.whitelist.as_slice()),
        HarvestLimits {
            quota: config.harvest.quota,
            stall_limit: config.harvest.stall_limit,
            max_steps: config.harvest.max_steps,
        },
    )
}

/// Harvest now and persist the result
pub async fn harvest_now(
    store: &RegistryStore,
    content: &dyn ContentSource,
    replenisher: &mut Replenisher,
    clock: &dyn Clock,
) -> Result<HarvestReport> {
    let mut state = store.load()?;
    let report = replenisher.run(&mut state, content, clock).await?;
    store.save(&state)?;
    Ok(report)
}

// ============================================================================
// Publish Cycle
// ============================================================================

/// Wires the scheduling core together
pub struct PublishCycle {
    config: Config,
    store: RegistryStore,
    content: Arc<dyn ContentSource>,
    orchestrator: PublishOrchestrator,
    selector: RotationSelector,
    gate: AlternationGate,
    limiter: RateLimiter,
    renderer: Renderer,
    replenisher: Option<Replenisher>,
    clock: Arc<dyn Clock>,
}

impl PublishCycle {
    /// Create a cycle with injected content source and actuator
    pub fn new(
        config: Config,
        content: Arc<dyn ContentSource>,
        actuator: Arc<dyn Actuator>,
    ) -> Result<Self> {
        config.validate()?;

        let retry = RetryConfig::fixed(config.publish.max_attempts, config.retry_delay());
        let orchestrator = PublishOrchestrator::new(actuator, retry, config.rotation.recent_window)
            .with_reference_normalizer(ReferenceExtractor::new(
                config.harvest.whitelist.as_slice(),
            ));
        let selector = match config.rotation.seed {
            Some(seed) => RotationSelector::with_seed(config.rotation.mode, seed),
            None => RotationSelector::new(config.rotation.mode),
        };

        Ok(Self {
            store: RegistryStore::new(&config.registry.path),
            content,
            orchestrator,
            selector,
            gate: AlternationGate::new(config.alternation.enabled),
            limiter: RateLimiter::new(config.min_interval(), config.publish.allow_force),
            renderer: Renderer::new(config.render.clone()),
            replenisher: None,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Create a cycle from configuration alone
    ///
    /// Uses the folder content source, the command actuator and, when a
    /// harvest source is configured, the chat export replenisher.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate_for_publish()?;

        let program = config
            .publish
            .actuator_command
            .clone()
            .ok_or_else(|| Error::config("publish.actuator_command is required to publish"))?;
        let actuator = CommandActuator::new(
            program,
            config.publish.actuator_args.clone(),
            config.actuator_timeout(),
        );
        let content = FsContentSource::new(&config.content);
        let replenisher = Replenisher::from_config(&config);

        let mut cycle = Self::new(config, Arc::new(content), Arc::new(actuator))?;
        cycle.replenisher = replenisher;
        Ok(cycle)
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refill the backlog from `replenisher` after cycles
    pub fn with_replenisher(mut self, replenisher: Replenisher) -> Self {
        self.replenisher = Some(replenisher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Run one cycle
    ///
    /// `force` requests a manual override of the minimum interval.
    ///
    /// # Errors
    ///
    /// Only fatal (configuration) errors are returned.
    pub async fn run_cycle(&mut self, force: bool) -> Result<CycleReport> {
        match self.try_cycle(force).await {
            Ok(report) => {
                info!(report = %report, "Cycle finished");
                Ok(report)
            }
            Err(Error::Scheduler(SchedulerError::SelectionExhausted { category })) => {
                warn!(category = %category, "Nothing to publish");
                Ok(CycleReport::NothingToPublish { category })
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(category = %e.category(), error = %e, "Cycle skipped");
                Ok(CycleReport::Skipped {
                    category: e.category(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn try_cycle(&mut self, force: bool) -> Result<CycleReport> {
        let mut state = self.store.load()?;
        self.orchestrator
            .replay_pending_moves(&mut state, &self.store, self.content.as_ref())?;

        let now = self.clock.now();
        let rate = self
            .limiter
            .can_publish(state.rate_gate.last_success_at, now, force);
        if !rate.allowed {
            let remaining = rate.remaining.unwrap_or_else(Duration::zero);
            info!(
                remaining = %format_seconds(remaining.num_seconds()),
                "Minimum interval not elapsed"
            );
            return Ok(CycleReport::RateLimited {
                remaining,
                explanation: rate.explanation,
            });
        }

        let backlog = self.publishable_pending(&state)?;
        let decision = self
            .gate
            .decide(state.alternation.last_category, backlog.len());
        info!(
            category = %decision.category,
            reason = %decision.reason,
            backlog = backlog.len(),
            "Category chosen"
        );

        let item = match decision.category {
            Category::Secondary => match self.first_readable(&backlog) {
                Some(item) => item,
                None => {
                    warn!("No readable secondary item, falling back to primary");
                    self.select_primary(&state)?
                }
            },
            Category::Primary => self.select_primary(&state)?,
        };

        let rendered = self.renderer.render(&item, now);
        let outcome = self
            .orchestrator
            .publish(
                &item,
                &rendered,
                &mut state,
                &self.store,
                self.content.as_ref(),
                self.clock.as_ref(),
            )
            .await?;

        let harvested = self.replenish_if_low(&mut state).await;

        Ok(match outcome {
            PublishOutcome::Published { record, .. } => CycleReport::Published {
                item_id: record.item_id,
                category: record.category,
                attempts: record.attempts,
                forced: rate.forced,
                harvested,
            },
            PublishOutcome::Failed { record } => CycleReport::Failed {
                item_id: record.item_id,
                category: record.category,
                attempts: record.attempts,
                error: record.error,
            },
        })
    }

    /// Pending ids minus items whose relocation is still outstanding
    fn publishable_pending(&self, state: &RegistryState) -> Result<Vec<String>> {
        let pending = self.content.list_pending()?;
        Ok(pending
            .into_iter()
            .filter(|id| !state.pending_moves.iter().any(|m| &m.item_id == id))
            .collect())
    }

    fn first_readable(&self, backlog: &[String]) -> Option<ContentItem> {
        for id in backlog {
            match self.content.read_pending(id) {
                Ok(item) => return Some(item),
                Err(e @ (SourceError::Malformed { .. } | SourceError::EmptyItem(_))) => {
                    warn!(item = %id, error = %e, "Skipping unreadable secondary item");
                }
                Err(e) => {
                    warn!(item = %id, error = %e, "Could not read secondary item");
                }
            }
        }
        None
    }

    /// Select a readable primary item
    ///
    /// Unreadable items are dropped from the candidate pool and selection is
    /// repeated, so the sequential cursor moves past them. Exhaustion is
    /// reported only when no item in the pool can be read.
    fn select_primary(&mut self, state: &RegistryState) -> Result<ContentItem> {
        let mut candidates = self.content.list_primary()?;

        loop {
            let id = self.selector.select(
                &candidates,
                &state.rotation.recent,
                state.rotation.last_primary.as_deref(),
            )?;

            match self.content.read_primary(&id) {
                Ok(item) => return Ok(item),
                Err(e @ SourceError::MissingFolder(_)) => return Err(e.into()),
                Err(e) => {
                    warn!(item = %id, error = %e, "Skipping unreadable primary item");
                    candidates.retain(|c| c != &id);
                }
            }
        }
    }

    /// Harvest when the backlog is low; failures never fail the cycle
    async fn replenish_if_low(&mut self, state: &mut RegistryState) -> Option<usize> {
        let replenisher = self.replenisher.as_mut()?;

        let pending = match self.content.pending_count() {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Could not count backlog");
                return None;
            }
        };
        if !replenisher.needs_replenish(pending) {
            return None;
        }

        info!(pending = pending, "Backlog low, harvesting");
        let result = replenisher
            .run(state, self.content.as_ref(), self.clock.as_ref())
            .await;

        match result {
            Ok(report) => match self.store.save(state) {
                Ok(()) => Some(report.accepted_count()),
                Err(e) => {
                    warn!(error = %e, "Could not save harvest results");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Harvest failed");
                None
            }
        }
    }
}
