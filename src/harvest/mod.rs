//! Incremental backlog harvesting
//!
//! Pulls candidate messages from an open-ended, newest-first source one step
//! at a time, keeps the ones carrying a new whitelisted media reference, and
//! stores them in the pending backlog.
//!
//! # Features
//!
//! - Platform whitelist with subdomain matching
//! - Reference normalization before deduplication
//! - Deduplication against every reference ever accepted and within the session
//! - Stop on quota, on a stall (consecutive steps with nothing new) or on an
//!   absolute step ceiling
//!
//! # Modules
//!
//! - [`reference`] - Link extraction and normalization
//! - [`engine`] - Harvest loop and bookkeeping
//! - [`export`] - Exported chat transcript source

pub mod engine;
pub mod export;
pub mod reference;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::error::HarvestError;

pub use engine::{
    mark_reference_used, AcceptedItem, HarvestEngine, HarvestLimits, HarvestReport, StopReason,
};
pub use export::ChatExportSource;
pub use reference::{ExtractedReference, ReferenceExtractor};

/// One message as delivered by a harvest source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    /// Full message text
    pub text: String,

    /// Sender, when the source knows it
    pub author: Option<String>,

    /// Send time as written by the source
    pub sent_at: Option<String>,
}

impl RawCandidate {
    /// Candidate with text only
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
            sent_at: None,
        }
    }
}

/// Identity of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestSession {
    pub id: Uuid,
    pub source_id: String,
    pub started_at: DateTime<Utc>,
}

impl HarvestSession {
    pub fn new(source_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.into(),
            started_at,
        }
    }
}

/// Open-ended, reverse-chronological candidate source
#[async_trait]
pub trait HarvestSource: Send + Sync {
    /// Identifier recorded in harvest events
    fn source_id(&self) -> &str;

    /// Reveal the next batch of candidates
    ///
    /// Each call moves further back in time. An empty batch means nothing new
    /// became visible.
    async fn fetch_next_batch(
        &mut self,
        session: &HarvestSession,
    ) -> Result<Vec<RawCandidate>, HarvestError>;
}
