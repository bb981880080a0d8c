//! Category alternation state machine
//!
//! The gate is computed once per cycle from the alternation cursor (category
//! of the last successful publish) and the live secondary backlog size.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Category;

/// Gate state derived from the last successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    NextPrimary,
    NextSecondary,
}

impl GateState {
    /// State after a publish of `last`
    pub fn after(last: Option<Category>) -> Self {
        match last {
            Some(Category::Primary) => Self::NextSecondary,
            Some(Category::Secondary) | None => Self::NextPrimary,
        }
    }
}

/// Why a category was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    /// Alternation switched off in configuration
    Disabled,
    /// Nothing published yet
    FirstPublication,
    /// Regular alternation step
    Alternate,
    /// Secondary was due but the backlog is empty
    BacklogEmpty,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disabled => "alternation disabled",
            Self::FirstPublication => "first publication",
            Self::Alternate => "alternating",
            Self::BacklogEmpty => "secondary backlog empty",
        };
        f.write_str(text)
    }
}

/// Result of a gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub state: GateState,
    pub category: Category,
    pub reason: GateReason,
}

/// Decides the category of the next cycle
#[derive(Debug, Clone, Copy)]
pub struct AlternationGate {
    enabled: bool,
}

impl AlternationGate {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Decide the next category
    ///
    /// # Arguments
    ///
    /// * `last` - Alternation cursor value
    /// * `secondary_backlog` - Pending secondary items right now
    pub fn decide(&self, last: Option<Category>, secondary_backlog: usize) -> GateDecision {
        let state = GateState::after(last);

        let (category, reason) = if !self.enabled {
            (Category::Primary, GateReason::Disabled)
        } else if last.is_none() {
            (Category::Primary, GateReason::FirstPublication)
        } else {
            match state {
                GateState::NextSecondary if secondary_backlog > 0 => {
                    (Category::Secondary, GateReason::Alternate)
                }
                GateState::NextSecondary => (Category::Primary, GateReason::BacklogEmpty),
                GateState::NextPrimary => (Category::Primary, GateReason::Alternate),
            }
        };

        GateDecision {
            state,
            category,
            reason,
        }
    }
}

impl Default for AlternationGate {
    fn default() -> Self {
        Self::new(true)
    }
}
