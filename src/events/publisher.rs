//! # Transition Event Publisher
//!
//! Broadcasts boundary transitions to whoever on the host side is listening.
//!
//! ## Usage
//!
//! ```rust
//! use geofencer_core::events::{TransitionEvent, TransitionEventPublisher};
//! use geofencer_core::models::{TransitionType, WatchDefinition};
//!
//! # tokio_test::block_on(async {
//! let publisher = TransitionEventPublisher::new(16);
//! let mut events = publisher.subscribe();
//!
//! let watch = WatchDefinition::new("home", 52.52, 13.40, 150.0);
//! let delivered = publisher
//!     .publish(TransitionEvent::new(TransitionType::ENTER, vec![watch]))
//!     .await;
//! assert_eq!(delivered, 1);
//!
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.watches[0].id, "home");
//! # });
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::constants::{DEFAULT_EVENT_CHANNEL_CAPACITY, TRANSITION_EVENT_NAME};
use crate::models::{TransitionType, WatchDefinition};

/// Fan-out of transition reports to the host
#[derive(Debug, Clone)]
pub struct TransitionEventPublisher {
    sender: broadcast::Sender<TransitionEvent>,
}

/// Watches whose region boundary was crossed, as pushed to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub name: String,
    pub transition_type: TransitionType,
    pub watches: Vec<WatchDefinition>,
    pub published_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(transition_type: TransitionType, watches: Vec<WatchDefinition>) -> Self {
        Self {
            name: TRANSITION_EVENT_NAME.to_string(),
            transition_type,
            watches,
            published_at: Utc::now(),
        }
    }

    /// The array of watch documents the host listener receives
    pub fn host_payload(&self) -> Result<Value, PublishError> {
        Ok(serde_json::to_value(&self.watches)?)
    }
}

impl TransitionEventPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish one transition event; returns how many subscribers received it
    pub async fn publish(&self, event: TransitionEvent) -> usize {
        let watch_count = event.watches.len();

        // send() only fails with no subscribers; the host may simply not be listening yet
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(watch_count, receivers, "Transition event published");
                receivers
            }
            Err(broadcast::error::SendError(_)) => {
                debug!(watch_count, "Transition event published with no subscribers");
                0
            }
        }
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for TransitionEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
