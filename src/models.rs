// Core data structures for the homily scheduler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::truncate_text;

/// Number of characters kept in a publication preview
pub const PREVIEW_CHARS: usize = 100;

// ============================================================================
// Category
// ============================================================================

/// Content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Always-available devotional text from the local pool
    Primary,
    /// Harvested media links waiting in the backlog
    Secondary,
}

impl Category {
    /// Get all categories
    pub fn all() -> Vec<Self> {
        vec![Self::Primary, Self::Secondary]
    }

    /// Get category ID
    pub fn id(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    /// The other category
    pub fn other(&self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "text" => Ok(Self::Primary),
            "secondary" | "link" | "media" => Ok(Self::Secondary),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

// ============================================================================
// Content Items
// ============================================================================

/// Raw payload of a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    /// Plain text body
    Text { body: String },

    /// External media reference with optional caption lines
    Link {
        reference: String,
        caption_fragments: Vec<String>,
    },
}

impl Payload {
    /// Text used for previews and length accounting
    pub fn preview_source(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Link {
                reference,
                caption_fragments,
            } => {
                if caption_fragments.is_empty() {
                    reference.clone()
                } else {
                    format!("{} {reference}", caption_fragments.join(" "))
                }
            }
        }
    }
}

/// A piece of content that can be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Stable identifier (file name)
    pub id: String,

    /// Category the item belongs to
    pub category: Category,

    /// Raw payload as stored by the content source
    pub payload: Payload,
}

impl ContentItem {
    /// Create a primary text item
    pub fn text(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: Category::Primary,
            payload: Payload::Text { body: body.into() },
        }
    }

    /// Create a secondary link item
    pub fn link(id: impl Into<String>, reference: impl Into<String>, caption: Vec<String>) -> Self {
        Self {
            id: id.into(),
            category: Category::Secondary,
            payload: Payload::Link {
                reference: reference.into(),
                caption_fragments: caption,
            },
        }
    }
}

/// Content in the shape the actuator publishes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
    /// Full post text
    pub text: String,

    /// Link whose preview the platform should attach
    pub media_reference: Option<String>,
}

// ============================================================================
// Publication Records
// ============================================================================

/// Result of a publish cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// One audit entry per attempted publish cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// When the cycle finished
    pub timestamp: DateTime<Utc>,

    /// Identifier of the published item
    pub item_id: String,

    pub category: Category,

    pub outcome: Outcome,

    /// Number of actuation attempts made
    pub attempts: u32,

    /// Wall-clock duration of all attempts in milliseconds
    pub duration_ms: u64,

    /// Truncated payload, for audit only
    pub preview: String,

    /// Payload length in characters
    #[serde(default)]
    pub length: usize,

    /// Last actuator error for failed cycles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublicationRecord {
    /// Build a record for an item with the preview already truncated
    pub fn new(
        timestamp: DateTime<Utc>,
        item: &ContentItem,
        outcome: Outcome,
        attempts: u32,
        duration_ms: u64,
    ) -> Self {
        let source = item.payload.preview_source();
        Self {
            timestamp,
            item_id: item.id.clone(),
            category: item.category,
            outcome,
            attempts,
            duration_ms,
            preview: truncate_text(&source, PREVIEW_CHARS),
            length: source.chars().count(),
            error: None,
        }
    }

    /// Attach the last actuation error
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether this record is a successful publish
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}
