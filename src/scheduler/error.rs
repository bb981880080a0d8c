//! Error types for the scheduler module

use std::fmt;

use crate::models::Category;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Unknown rotation mode name
    InvalidRotationMode {
        value: String,
        valid_options: Vec<String>,
    },

    /// Recent window must hold at least one identifier
    InvalidWindow { size: usize },

    /// No item of the category could be selected
    SelectionExhausted { category: Category },

    /// Minimum interval is out of range
    InvalidInterval { minutes: i64 },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRotationMode {
                value,
                valid_options,
            } => {
                write!(
                    f,
                    "Invalid rotation mode '{}'. Valid options: {}",
                    value,
                    valid_options.join(", ")
                )
            }
            Self::InvalidWindow { size } => {
                write!(f, "Invalid recent window size {}. Must be at least 1", size)
            }
            Self::SelectionExhausted { category } => {
                write!(f, "Nothing to publish in category '{}'", category)
            }
            Self::InvalidInterval { minutes } => {
                write!(f, "Invalid minimum interval {} minutes", minutes)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid rotation mode error
    pub fn invalid_rotation_mode(value: impl Into<String>) -> Self {
        Self::InvalidRotationMode {
            value: value.into(),
            valid_options: vec!["random".to_string(), "sequential".to_string()],
        }
    }

    /// Create a selection exhausted error
    pub fn exhausted(category: Category) -> Self {
        Self::SelectionExhausted { category }
    }

    /// Short operator-facing hint
    pub fn hint(&self) -> String {
        match self {
            Self::InvalidRotationMode { .. } => {
                "set rotation.mode to 'random' or 'sequential'".to_string()
            }
            Self::InvalidWindow { .. } => "set rotation.recent_window to 1 or more".to_string(),
            Self::SelectionExhausted { category } => match category {
                Category::Primary => "add .txt files to the primary folder".to_string(),
                Category::Secondary => "run a harvest to refill the backlog".to_string(),
            },
            Self::InvalidInterval { .. } => {
                "set publish.min_interval_minutes to 0 or more".to_string()
            }
        }
    }

    /// Check if the error is recoverable
    ///
    /// Exhaustion clears itself once content is added; the rest are
    /// configuration mistakes.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SelectionExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rotation_mode_error() {
        let err = SchedulerError::invalid_rotation_mode("shuffle");
        assert!(err.to_string().contains("shuffle"));
        assert!(err.to_string().contains("sequential"));
    }

    #[test]
    fn test_exhausted_hint() {
        let err = SchedulerError::exhausted(Category::Secondary);
        assert!(err.to_string().contains("secondary"));
        assert!(err.hint().contains("harvest"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(SchedulerError::exhausted(Category::Primary).is_recoverable());
        assert!(!SchedulerError::InvalidWindow { size: 0 }.is_recoverable());
    }
}
