//! Persistence for scheduling state and content
//!
//! - [`state`] - Registry document types and their mutations
//! - [`registry`] - Atomic JSON store with load-time repair
//! - [`backlog`] - Primary pool and secondary backlog folders

pub mod backlog;
pub mod registry;
pub mod state;

pub use backlog::{parse_secondary, ContentSource, FsContentSource, MoveOutcome};
pub use registry::{RegistryStore, ResetScope};
pub use state::{
    AlternationCursor, HarvestEvent, HarvestState, PendingMove, PublicationStats, RateGate,
    RegistryState, RotationState, StatsSummary, SCHEMA_VERSION,
};
