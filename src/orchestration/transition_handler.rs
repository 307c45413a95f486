//! # Transition Handler
//!
//! Out-of-band entry point for transitions reported by the geofencing service.
//! Reported ids are resolved against the store, filtered by each watch's
//! activity window and pushed to the host as one [`TransitionEvent`].

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::WatchListStore;
use crate::error::Result;
use crate::events::{TransitionEvent, TransitionEventPublisher};
use crate::models::{TransitionType, WatchDefinition};

#[derive(Debug, Clone)]
pub struct TransitionHandler {
    store: Arc<dyn WatchListStore>,
    publisher: TransitionEventPublisher,
}

impl TransitionHandler {
    pub fn new(store: Arc<dyn WatchListStore>, publisher: TransitionEventPublisher) -> Self {
        Self { store, publisher }
    }

    pub fn publisher(&self) -> &TransitionEventPublisher {
        &self.publisher
    }

    /// Resolve `ids` reported for a `kind` transition and publish the active ones.
    ///
    /// Unknown ids are skipped. Returns what was delivered to the host.
    pub async fn handle_transition(
        &self,
        ids: &[String],
        kind: TransitionType,
    ) -> Result<Vec<WatchDefinition>> {
        let mut triggered = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.find_by_id(id).await? {
                Some(mut definition) => {
                    definition.transition_type = kind;
                    triggered.push(definition);
                }
                None => warn!(watch_id = %id, "Transition reported for unknown watch"),
            }
        }

        self.publish_active(triggered, kind).await
    }

    /// Publish definitions supplied directly by the service
    pub async fn deliver(&self, definitions: Vec<WatchDefinition>) -> Result<Vec<WatchDefinition>> {
        let kind = definitions
            .iter()
            .map(|definition| definition.transition_type)
            .reduce(|acc, kind| acc | kind);

        match kind {
            Some(kind) => self.publish_active(definitions, kind).await,
            None => Ok(Vec::new()),
        }
    }

    async fn publish_active(
        &self,
        definitions: Vec<WatchDefinition>,
        kind: TransitionType,
    ) -> Result<Vec<WatchDefinition>> {
        let now = Utc::now();
        let (active, inactive): (Vec<_>, Vec<_>) = definitions
            .into_iter()
            .partition(|definition| definition.is_within_time_range(now));

        for definition in &inactive {
            debug!(watch_id = %definition.id, "Transition outside activity window, dropped");
        }

        if active.is_empty() {
            return Ok(active);
        }

        let event = TransitionEvent::new(kind, active.clone());
        let receivers = self.publisher.publish(event).await;

        debug!(
            count = active.len(),
            receivers,
            transition = %kind,
            "Transition delivered to host"
        );
        Ok(active)
    }
}
