//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

use homily::config::Config;
use homily::harvest::{HarvestSession, HarvestSource, RawCandidate};
use homily::models::RenderedContent;
use homily::publisher::Actuator;
use homily::utils::error::{ActuationError, HarvestError};

/// Fixed starting instant for clock-driven tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
}

// ============================================================================
// Actuator
// ============================================================================

/// Actuator that fails a scripted number of times, then succeeds
pub struct StubActuator {
    failures_left: AtomicU32,
    calls: AtomicU32,
    published: Mutex<Vec<RenderedContent>>,
}

impl StubActuator {
    pub fn succeeding() -> Self {
        Self::failing(0)
    }

    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            calls: AtomicU32::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<RenderedContent> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Actuator for StubActuator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn publish(&self, content: &RenderedContent) -> Result<(), ActuationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ActuationError::Failed("composer unavailable".into()));
        }

        self.published.lock().unwrap().push(content.clone());
        Ok(())
    }
}

// ============================================================================
// Harvest Source
// ============================================================================

/// Source that replays scripted batches, then returns empty batches
pub struct VecHarvestSource {
    batches: VecDeque<Vec<RawCandidate>>,
    fail_at: Option<u32>,
    step: u32,
}

impl VecHarvestSource {
    pub fn new(batches: Vec<Vec<&str>>) -> Self {
        Self {
            batches: batches
                .into_iter()
                .map(|b| b.into_iter().map(RawCandidate::text).collect())
                .collect(),
            fail_at: None,
            step: 0,
        }
    }

    /// Fail on the given 1-based fetch
    pub fn failing_at(mut self, step: u32) -> Self {
        self.fail_at = Some(step);
        self
    }
}

#[async_trait]
impl HarvestSource for VecHarvestSource {
    fn source_id(&self) -> &str {
        "scripted"
    }

    async fn fetch_next_batch(
        &mut self,
        _session: &HarvestSession,
    ) -> Result<Vec<RawCandidate>, HarvestError> {
        self.step += 1;
        if self.fail_at == Some(self.step) {
            return Err(HarvestError::Fetch("export unreadable".into()));
        }
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

// ============================================================================
// Workspace
// ============================================================================

/// Temporary content folders plus a matching configuration
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let mut config = Config::default();
        config.content.primary_dir = root.join("primary");
        config.content.pending_dir = root.join("pending");
        config.content.consumed_dir = root.join("consumed");
        config.registry.path = root.join("registry.json");
        config.rotation.seed = Some(7);
        config.publish.retry_delay_secs = 0;
        config.publish.min_interval_minutes = 0;

        fs::create_dir_all(&config.content.primary_dir).unwrap();
        fs::create_dir_all(&config.content.pending_dir).unwrap();
        fs::create_dir_all(&config.content.consumed_dir).unwrap();

        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `count` primary texts named `text-NN.txt`
    pub fn with_primary(self, count: usize) -> Self {
        for i in 1..=count {
            let path = self.config.content.primary_dir.join(format!("text-{i:02}.txt"));
            fs::write(path, format!("Devotional text number {i}.")).unwrap();
        }
        self
    }

    /// Write `count` pending secondary items starting at `item-001.txt`
    pub fn with_pending(self, count: u32) -> Self {
        for n in 1..=count {
            self.write_pending(n, &format!("https://youtu.be/video{n}"));
        }
        self
    }

    pub fn write_pending(&self, number: u32, reference: &str) -> PathBuf {
        let path = self.pending_path(number);
        fs::write(&path, format!("Sunday sermon {number}\n{reference}\n")).unwrap();
        path
    }

    pub fn pending_path(&self, number: u32) -> PathBuf {
        self.config
            .content
            .pending_dir
            .join(format!("item-{number:03}.txt"))
    }

    pub fn consumed_path(&self, number: u32) -> PathBuf {
        self.config
            .content
            .consumed_dir
            .join(format!("item-{number:03}.txt"))
    }
}
