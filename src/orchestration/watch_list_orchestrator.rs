//! # Watch-List Orchestrator
//!
//! Application-facing coordinator that turns watch-list operations into store
//! mutations plus commands on the [`CommandExecutor`].
//!
//! ## Ordering
//!
//! The store is the source of truth and the service's registrations are a cache
//! of it, so the store may run ahead of the service but never behind:
//!
//! - **add**: every definition is written before the ADD command is built and
//!   queued. A failed write returns the error and queues nothing.
//! - **remove**: the REMOVE command is built and the listener wired, then the
//!   ids are deleted, then the command is queued. A failed delete still queues
//!   the command for the full id list and the first error is returned.
//! - **restore**: one fire-and-forget ADD covering everything stored.

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::database::{StoreError, WatchListStore};
use crate::error::{GeofencerError, Result};
use crate::execution::{Command, CommandExecutor, CommandOutcome};
use crate::logging::log_error;
use crate::models::WatchDefinition;
use crate::services::TransitionTarget;
use crate::validation::validate_watch_batch;

/// Handle on a queued command's completion
#[derive(Debug)]
pub struct CommandTicket {
    command_id: Uuid,
    completion: oneshot::Receiver<CommandOutcome>,
}

impl CommandTicket {
    fn attach(command: &mut Command) -> Self {
        Self {
            command_id: command.id(),
            completion: command.completion(),
        }
    }

    pub fn command_id(&self) -> Uuid {
        self.command_id
    }

    /// Wait for the command's outcome
    pub async fn wait(self) -> Result<CommandOutcome> {
        self.completion
            .await
            .map_err(|_| GeofencerError::ExecutorStopped(self.command_id))
    }
}

pub struct WatchListOrchestrator {
    store: Arc<dyn WatchListStore>,
    executor: Arc<CommandExecutor>,
    target: TransitionTarget,
    span: Span,
}

impl WatchListOrchestrator {
    pub fn new(
        store: Arc<dyn WatchListStore>,
        executor: Arc<CommandExecutor>,
        target: TransitionTarget,
    ) -> Self {
        let span = info_span!(
            "watch_list_orchestrator",
            executor_id = %executor.id(),
            receiver = %target
        );
        Self {
            store,
            executor,
            target,
            span,
        }
    }

    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    pub fn store(&self) -> &Arc<dyn WatchListStore> {
        &self.store
    }

    /// Persist `definitions`, then queue one ADD covering the batch.
    ///
    /// `on_done` fires once with the command's outcome.
    pub async fn add_watches<F>(&self, definitions: Vec<WatchDefinition>, on_done: F) -> Result<Uuid>
    where
        F: FnOnce(&CommandOutcome) + Send + 'static,
    {
        let (command_id, ()) = self
            .submit_add(definitions, |command| command.add_completion_listener(on_done))
            .instrument(self.span.clone())
            .await?;
        Ok(command_id)
    }

    /// [`Self::add_watches`] returning a ticket instead of taking a listener
    pub async fn add_watches_tracked(
        &self,
        definitions: Vec<WatchDefinition>,
    ) -> Result<CommandTicket> {
        let (_, ticket) = self
            .submit_add(definitions, CommandTicket::attach)
            .instrument(self.span.clone())
            .await?;
        Ok(ticket)
    }

    /// Queue one REMOVE for `ids`, deleting them from the store before it runs
    pub async fn remove_watches<F>(&self, ids: Vec<String>, on_done: F) -> Result<Uuid>
    where
        F: FnOnce(&CommandOutcome) + Send + 'static,
    {
        let mut command = Command::remove(ids);
        command.add_completion_listener(on_done);
        self.submit_remove(command)
            .instrument(self.span.clone())
            .await
    }

    pub async fn remove_watches_tracked(&self, ids: Vec<String>) -> Result<CommandTicket> {
        let mut command = Command::remove(ids);
        let ticket = CommandTicket::attach(&mut command);
        self.submit_remove(command)
            .instrument(self.span.clone())
            .await?;
        Ok(ticket)
    }

    /// Remove every stored watch
    pub async fn remove_all_watches<F>(&self, on_done: F) -> Result<Uuid>
    where
        F: FnOnce(&CommandOutcome) + Send + 'static,
    {
        let ids = self.store.ids().instrument(self.span.clone()).await?;
        self.remove_watches(ids, on_done).await
    }

    pub async fn remove_all_watches_tracked(&self) -> Result<CommandTicket> {
        let ids = self.store.ids().instrument(self.span.clone()).await?;
        self.remove_watches_tracked(ids).await
    }

    /// Re-register everything in the store; returns the ADD command id, if any
    pub async fn restore_from_storage(&self) -> Result<Option<Uuid>> {
        async {
            let definitions = self.store.get_all().await?;
            if definitions.is_empty() {
                debug!("Nothing stored, skipping restore");
                return Ok(None);
            }

            let count = definitions.len();
            let command_id = self
                .executor
                .enqueue(Command::add(definitions, self.target.clone()));
            info!(command_id = %command_id, count, "🔁 Restoring stored watches");
            Ok(Some(command_id))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Read-through to the store
    pub async fn list_watches(&self) -> Result<Vec<WatchDefinition>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn find_watch(&self, id: &str) -> Result<Option<WatchDefinition>> {
        Ok(self.store.find_by_id(id).await?)
    }

    async fn submit_add<W, T>(
        &self,
        definitions: Vec<WatchDefinition>,
        wire: W,
    ) -> Result<(Uuid, T)>
    where
        W: FnOnce(&mut Command) -> T,
    {
        validate_watch_batch(&definitions)?;

        for definition in &definitions {
            if let Err(e) = self.store.put(definition).await {
                log_error(
                    "watch_list_orchestrator",
                    "add_watches",
                    &e.to_string(),
                    Some(&definition.id),
                );
                return Err(e.into());
            }
        }

        let count = definitions.len();
        let mut command = Command::add(definitions, self.target.clone());
        let wired = wire(&mut command);
        let command_id = self.executor.enqueue(command);

        info!(command_id = %command_id, count, "➕ Watches stored and ADD queued");
        Ok((command_id, wired))
    }

    async fn submit_remove(&self, command: Command) -> Result<Uuid> {
        let ids = command.kind().watch_ids();
        let mut first_error: Option<StoreError> = None;

        for id in &ids {
            if let Err(e) = self.store.remove(id).await {
                log_error(
                    "watch_list_orchestrator",
                    "remove_watches",
                    &e.to_string(),
                    Some(id),
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        let command_id = self.executor.enqueue(command);
        info!(command_id = %command_id, count = ids.len(), "➖ Watches deleted and REMOVE queued");

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(command_id),
        }
    }
}

impl std::fmt::Debug for WatchListOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchListOrchestrator")
            .field("store", &self.store)
            .field("executor", &self.executor)
            .field("target", &self.target)
            .finish()
    }
}
