//! homily - Devotional content publishing scheduler
//!
//! Periodically selects a short devotional text from a local pool, or a sermon
//! link harvested from a group chat, and hands it to an external actuator that
//! publishes it. The library is the scheduling and state-management core.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`scheduler`] - Rotation, alternation and rate limiting
//! - [`storage`] - Registry document and content folders
//! - [`harvest`] - Incremental backlog harvesting
//! - [`publisher`] - Actuator interface and bounded-retry orchestration
//! - [`render`] - Post text rendering
//! - [`pipeline`] - One publish cycle, end to end
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use homily::config::Config;
//! use homily::pipeline::PublishCycle;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let mut cycle = PublishCycle::from_config(config)?;
//!     let report = cycle.run_cycle(false).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod render;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, HomilyErrorTrait, Result};
    pub use crate::harvest::{HarvestSource, RawCandidate};
    pub use crate::models::{Category, ContentItem, Outcome, PublicationRecord, RenderedContent};
    pub use crate::pipeline::{CycleReport, PublishCycle};
    pub use crate::publisher::Actuator;
    pub use crate::storage::{ContentSource, FsContentSource, RegistryState, RegistryStore};
}

// Direct re-exports for convenience
pub use models::{Category, ContentItem, PublicationRecord};
