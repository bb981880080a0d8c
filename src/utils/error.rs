//! Error types for the homily scheduler
//!
//! This module defines the per-domain error types used by the content source,
//! the harvest engine, the actuator and the registry store.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a content source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Configured folder does not exist
    #[error("Content folder not found: {}", .0.display())]
    MissingFolder(PathBuf),

    /// Requested item is not present
    #[error("Content item not found: {0}")]
    ItemNotFound(String),

    /// Item file exists but has no usable content
    #[error("Content item is empty: {0}")]
    EmptyItem(String),

    /// Secondary item has no usable reference
    #[error("Content item {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },

    /// Underlying file system failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while harvesting new candidates
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Source cannot be opened at all
    #[error("Harvest source unavailable: {0}")]
    SourceUnavailable(String),

    /// A fetch step failed
    #[error("Harvest fetch failed: {0}")]
    Fetch(String),

    /// Accepted items could not be written to the backlog
    #[error("Failed to store harvested item: {0}")]
    Store(#[from] SourceError),
}

/// Opaque failures reported by the external actuator
#[derive(Error, Debug)]
pub enum ActuationError {
    /// Actuator ran and reported failure
    #[error("Actuation failed: {0}")]
    Failed(String),

    /// Actuator did not finish in time
    #[error("Actuation timed out after {0:?}")]
    Timeout(Duration),

    /// Actuator could not be started
    #[error("Actuator could not be launched: {0}")]
    Launch(String),
}

/// Errors raised by the registry store
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Reading or writing the registry document failed
    #[error("Registry I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry could not be serialized
    #[error("Registry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Registry document is structurally invalid
    #[error("Registry document is corrupt ({}): {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl RegistryError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
