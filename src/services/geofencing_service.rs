//! # External Geofencing Service Boundary
//!
//! The platform location service that actually evaluates regions. The core only
//! connects, registers, unregisters and disconnects; transition detection happens
//! on the other side of this trait and comes back through
//! [`TransitionHandler`](crate::orchestration::TransitionHandler).

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::models::TransitionType;

/// Region as registered with the external service
#[derive(Debug, Clone, PartialEq)]
pub struct Geofence {
    pub request_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub transition_types: TransitionType,
    pub expiration: Option<Duration>,
    pub loitering_delay: Option<Duration>,
}

/// Where the service delivers transitions for registered regions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionTarget {
    receiver: String,
}

impl TransitionTarget {
    pub fn new(receiver: impl Into<String>) -> Self {
        Self {
            receiver: receiver.into(),
        }
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.receiver)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("Connection to geofencing service failed (code {code}): {message}")]
    ConnectionFailed { code: i32, message: String },

    #[error("Geofencing service rejected the request (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("Geofencing service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn connection_failed(code: i32, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            code,
            message: message.into(),
        }
    }

    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Connection-oriented client of the platform geofencing service.
///
/// Futures returned here are driven on spawned tasks, so implementations may
/// complete on any runtime thread.
#[async_trait]
pub trait GeofencingService: Send + Sync + fmt::Debug {
    /// Whether the platform service can be used at all on this device
    fn is_available(&self) -> bool {
        true
    }

    /// Establish the service session
    async fn connect(&self) -> Result<(), ServiceError>;

    /// Release the service session; must tolerate being called when not connected
    fn disconnect(&self);

    async fn register_geofences(
        &self,
        geofences: Vec<Geofence>,
        target: &TransitionTarget,
    ) -> Result<(), ServiceError>;

    async fn unregister_geofences(&self, ids: Vec<String>) -> Result<(), ServiceError>;
}
