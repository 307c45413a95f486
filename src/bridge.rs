//! # Host Bridge
//!
//! Thin adapter the host application calls into. Mutations resolve when their
//! command completes, so a rejected or timed-out registration comes back as
//! [`GeofencerError::CommandFailed`] rather than a silent "done".

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{GeofencerError, Result};
use crate::events::TransitionEvent;
use crate::models::{TransitionType, WatchDefinition};
use crate::orchestration::{CommandTicket, GeofencerSystem};

#[derive(Debug, Clone)]
pub struct GeofencerBridge {
    system: GeofencerSystem,
}

impl GeofencerBridge {
    pub fn new(system: GeofencerSystem) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &GeofencerSystem {
        &self.system
    }

    /// Check the platform service can be used
    pub fn initialize(&self) -> Result<()> {
        if !self.system.service().is_available() {
            return Err(GeofencerError::ServiceUnavailable(
                "platform geofencing service is not available on this device".to_string(),
            ));
        }
        debug!("Geofencer bridge initialized");
        Ok(())
    }

    /// Add or replace watches and wait for their registration
    pub async fn add_or_update(&self, definitions: Vec<WatchDefinition>) -> Result<()> {
        let ticket = self
            .system
            .orchestrator()
            .add_watches_tracked(definitions)
            .await?;
        Self::resolve(ticket).await
    }

    /// [`Self::add_or_update`] taking one watch document or an array of them
    pub async fn add_or_update_json(&self, value: Value) -> Result<()> {
        let definitions = match value {
            Value::Array(_) => serde_json::from_value(value)?,
            single => vec![serde_json::from_value(single)?],
        };
        self.add_or_update(definitions).await
    }

    pub async fn remove(&self, ids: Vec<String>) -> Result<()> {
        let ticket = self
            .system
            .orchestrator()
            .remove_watches_tracked(ids)
            .await?;
        Self::resolve(ticket).await
    }

    pub async fn remove_all(&self) -> Result<()> {
        let ticket = self
            .system
            .orchestrator()
            .remove_all_watches_tracked()
            .await?;
        Self::resolve(ticket).await
    }

    pub async fn get_watched(&self) -> Result<Vec<WatchDefinition>> {
        self.system.orchestrator().list_watches().await
    }

    /// Watched list as the host's JSON array
    pub async fn get_watched_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.get_watched().await?)?)
    }

    /// Transition events pushed as `onTransitionReceived`
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.system.publisher().subscribe()
    }

    /// Service callback: `ids` crossed their boundary with `kind`
    pub async fn on_transition_received(
        &self,
        ids: &[String],
        kind: TransitionType,
    ) -> Result<Vec<WatchDefinition>> {
        self.system
            .transition_handler()
            .handle_transition(ids, kind)
            .await
    }

    async fn resolve(ticket: CommandTicket) -> Result<()> {
        ticket.wait().await?.into_result()?;
        Ok(())
    }
}
