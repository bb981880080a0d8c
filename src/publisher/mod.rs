//! Publication through an external actuator
//!
//! The actuator is the only capability the core needs from the outside world:
//! take rendered content and publish it, reporting an opaque failure when it
//! could not. Everything around it (retries, bookkeeping, relocation of
//! consumed items) lives in [`orchestrator`].

pub mod command;
pub mod orchestrator;

use async_trait::async_trait;

use crate::models::RenderedContent;
use crate::utils::error::ActuationError;

pub use command::CommandActuator;
pub use orchestrator::{PublishOrchestrator, PublishOutcome};

/// Publishes rendered content to the target platform
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str {
        "actuator"
    }

    /// Publish once; retries are the caller's business
    async fn publish(&self, content: &RenderedContent) -> Result<(), ActuationError>;
}
