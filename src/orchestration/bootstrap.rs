//! # Geofencer Bootstrap
//!
//! Wires store, executor, orchestrator, publisher and transition handler from a
//! [`GeofencerConfig`]. [`GeofencerSystem::restore_on_boot`] is the entry point
//! for the platform's boot/restart signal.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GeofencerConfig;
use crate::database::{SqliteWatchListStore, WatchListStore};
use crate::error::Result;
use crate::events::TransitionEventPublisher;
use crate::execution::CommandExecutor;
use crate::orchestration::{TransitionHandler, WatchListOrchestrator};
use crate::services::{GeofencingService, TransitionTarget};

/// Fully wired watch-list pipeline
#[derive(Debug, Clone)]
pub struct GeofencerSystem {
    config: GeofencerConfig,
    service: Arc<dyn GeofencingService>,
    orchestrator: Arc<WatchListOrchestrator>,
    transition_handler: Arc<TransitionHandler>,
    publisher: TransitionEventPublisher,
}

impl GeofencerSystem {
    /// Open the sqlite store named in `config` and wire everything around it
    pub async fn bootstrap(
        config: &GeofencerConfig,
        service: Arc<dyn GeofencingService>,
    ) -> Result<Self> {
        config.validate()?;
        let store = SqliteWatchListStore::connect(&config.store).await?;
        Self::with_store(config, service, Arc::new(store))
    }

    /// Wire the pipeline around an existing store
    pub fn with_store(
        config: &GeofencerConfig,
        service: Arc<dyn GeofencingService>,
        store: Arc<dyn WatchListStore>,
    ) -> Result<Self> {
        config.validate()?;

        if !service.is_available() {
            warn!("⚠️ Geofencing service reports unavailable; commands will fail until it recovers");
        }

        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&service),
            &config.executor,
        )?);
        let orchestrator = Arc::new(WatchListOrchestrator::new(
            Arc::clone(&store),
            executor,
            TransitionTarget::new(config.service.transition_receiver.clone()),
        ));
        let publisher = TransitionEventPublisher::new(config.events.channel_capacity);
        let transition_handler = Arc::new(TransitionHandler::new(store, publisher.clone()));

        info!(
            receiver = %config.service.transition_receiver,
            command_timeout_ms = config.executor.command_timeout_ms,
            "🚀 Geofencer system bootstrapped"
        );

        Ok(Self {
            config: config.clone(),
            service,
            orchestrator,
            transition_handler,
            publisher,
        })
    }

    /// Boot trigger: bootstrap, then re-register everything stored
    pub async fn restore_on_boot(
        config: &GeofencerConfig,
        service: Arc<dyn GeofencingService>,
    ) -> Result<Self> {
        let system = Self::bootstrap(config, service).await?;
        system.orchestrator.restore_from_storage().await?;
        Ok(system)
    }

    pub fn config(&self) -> &GeofencerConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn GeofencingService> {
        &self.service
    }

    pub fn orchestrator(&self) -> &Arc<WatchListOrchestrator> {
        &self.orchestrator
    }

    pub fn transition_handler(&self) -> &Arc<TransitionHandler> {
        &self.transition_handler
    }

    pub fn publisher(&self) -> &TransitionEventPublisher {
        &self.publisher
    }
}
