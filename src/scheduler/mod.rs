//! Publication scheduling core
//!
//! This module holds the small, explicit state machines evaluated once per
//! publish cycle. None of them touch the file system; they read the registry
//! state they are given and return a decision.
//!
//! # Features
//!
//! - **Rotation**: random (no-repeat-recent) or sequential selection of primary items
//! - **Alternation**: primary/secondary category gate driven by the last publish
//! - **Rate Limiting**: minimum interval between successful publications with a
//!   configurable manual override
//!
//! # Cycle Order
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ RateLimiter│──▶│AlternationGate│──▶│ RotationSelector / │
//! │            │   │               │   │ backlog head       │
//! └────────────┘   └──────────────┘   └────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`rotation`] - Selection algorithms and the recent window
//! - [`alternation`] - Category gate
//! - [`rate_limit`] - Minimum-interval check
//! - [`error`] - Scheduler error type

pub mod alternation;
pub mod error;
pub mod rate_limit;
pub mod rotation;

// Re-export main types
pub use alternation::{AlternationGate, GateDecision, GateReason, GateState};
pub use error::{SchedulerError, SchedulerResult};
pub use rate_limit::{advance_gate, RateDecision, RateLimiter};
pub use rotation::{
    push_recent, select_random, select_sequential, RotationMode, RotationSelector,
    DEFAULT_RECENT_WINDOW,
};
