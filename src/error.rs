//! Unified error handling for the homily crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`HomilyErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Only configuration errors are fatal. Everything else is caught at the
//! publish-cycle boundary, logged and turned into a cycle report.
//!
//! # Usage
//!
//! ```rust,ignore
//! use homily::error::{Error, HomilyErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_fatal() {
//!         eprintln!("Fatal error: {}", err);
//!     } else {
//!         println!("Skipping cycle ({}): {}", err.category(), err);
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::scheduler::error::SchedulerError;
pub use crate::utils::error::{ActuationError, HarvestError, RegistryError, SourceError};

/// Common trait for homily error types
pub trait HomilyErrorTrait: std::error::Error {
    /// Check if this error is recoverable (next cycle may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;

    /// Whether the process should abort instead of skipping the cycle
    fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Config
    }
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration and validation errors
    Config,
    /// Registry persistence errors
    Storage,
    /// Content folder errors
    Content,
    /// Harvest source errors
    Harvest,
    /// External actuator errors
    Actuation,
    /// Selection and timing errors
    Scheduler,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short lowercase label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Storage => "storage",
            Self::Content => "content",
            Self::Harvest => "harvest",
            Self::Actuation => "actuation",
            Self::Scheduler => "scheduler",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unified error type for the homily crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Registry load/save errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Content source errors
    #[error("Content error: {0}")]
    Source(#[from] SourceError),

    /// Harvest errors
    #[error("Harvest error: {0}")]
    Harvest(#[from] HarvestError),

    /// Actuator errors
    #[error("Actuation error: {0}")]
    Actuation(#[from] ActuationError),

    /// Scheduler and selection errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl HomilyErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Registry(_) => true,
            Self::Source(SourceError::MissingFolder(_)) => false,
            Self::Source(_) => true,
            Self::Harvest(_) => true,
            Self::Actuation(_) => true,
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Scheduler(SchedulerError::SelectionExhausted { .. }) => ErrorCategory::Scheduler,
            Self::Scheduler(_) => ErrorCategory::Config,
            Self::Registry(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Source(_) => ErrorCategory::Content,
            Self::Harvest(_) => ErrorCategory::Harvest,
            Self::Actuation(_) => ErrorCategory::Actuation,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
