//! Error types for the geofencer core.
//!

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::execution::CommandFailure;

#[derive(Debug, Error)]
pub enum GeofencerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Geofencing service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Command failed: {0}")]
    CommandFailed(#[from] CommandFailure),
    #[error("Command executor stopped before command {0} completed")]
    ExecutorStopped(uuid::Uuid),
    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeofencerError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error came from the persistent store rather than the command pipeline
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, GeofencerError>;
