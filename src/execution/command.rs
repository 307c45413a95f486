//! # Geofence Commands
//!
//! One queued mutation against the external service. ADD and REMOVE are
//! variants of [`CommandKind`]; the executor drives every command through the
//! same lifecycle and only asks the kind for its concrete service operation.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::session::ConnectionSession;
use crate::constants::command_kinds;
use crate::models::WatchDefinition;
use crate::services::{GeofencingService, ServiceError, TransitionTarget};
use crate::state_machine::{determine_target_state, CommandEvent, CommandState};

/// Listener invoked once when a command finishes
pub type CompletionListener = Box<dyn FnOnce(&CommandOutcome) + Send + 'static>;

/// Operation kind and operand
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Register the watches, delivering transitions to `target`
    Add {
        watches: Vec<WatchDefinition>,
        target: TransitionTarget,
    },
    /// Unregister by id; the ids need not exist in the store any more
    Remove { ids: Vec<String> },
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => command_kinds::ADD,
            Self::Remove { .. } => command_kinds::REMOVE,
        }
    }

    pub fn operand_len(&self) -> usize {
        match self {
            Self::Add { watches, .. } => watches.len(),
            Self::Remove { ids } => ids.len(),
        }
    }

    /// Ids touched by this command
    pub fn watch_ids(&self) -> Vec<String> {
        match self {
            Self::Add { watches, .. } => watches.iter().map(|w| w.id.clone()).collect(),
            Self::Remove { ids } => ids.clone(),
        }
    }

    /// The concrete service call for this kind, detached from the command
    pub(crate) fn perform_against_service(
        &self,
        service: Arc<dyn GeofencingService>,
    ) -> BoxFuture<'static, Result<(), ServiceError>> {
        match self {
            Self::Add { watches, target } => {
                let geofences = watches.iter().map(WatchDefinition::to_geofence).collect();
                let target = target.clone();
                async move { service.register_geofences(geofences, &target).await }.boxed()
            }
            Self::Remove { ids } => {
                let ids = ids.clone();
                async move { service.unregister_geofences(ids).await }.boxed()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandFailure {
    #[error("connection to geofencing service failed: {0}")]
    ConnectionFailed(String),
    #[error("geofencing service rejected the operation: {0}")]
    Rejected(String),
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result handed to every completion listener
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Succeeded,
    Failed(CommandFailure),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Succeeded => None,
        }
    }

    pub fn into_result(self) -> Result<(), CommandFailure> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed(failure) => Err(failure),
        }
    }

    fn as_event(&self) -> CommandEvent {
        match self {
            Self::Succeeded => CommandEvent::OperationSucceeded,
            Self::Failed(CommandFailure::ConnectionFailed(msg)) => {
                CommandEvent::SessionFailed(msg.clone())
            }
            Self::Failed(CommandFailure::Rejected(msg)) => CommandEvent::OperationFailed(msg.clone()),
            Self::Failed(CommandFailure::TimedOut(_)) => CommandEvent::TimedOut,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// What the executor has to do after handing a command the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecuteStep {
    /// Session was already up; start the operation now
    Ready,
    /// Wait for the session's connected/failed event
    AwaitingConnection,
    /// Command was not pending
    Ignored,
}

/// A command that reached `Completed` and still has to notify its listeners
pub(crate) struct CompletedCommand {
    pub(crate) id: Uuid,
    pub(crate) kind: &'static str,
    pub(crate) outcome: CommandOutcome,
    listeners: Vec<CompletionListener>,
}

impl CompletedCommand {
    /// Invoke every listener once, in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run and the
    /// executor still advances.
    pub(crate) fn notify_listeners(self) {
        for listener in self.listeners {
            let outcome = &self.outcome;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(outcome))) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|m| (*m).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(
                    command_id = %self.id,
                    kind = self.kind,
                    panic = %message,
                    "Completion listener panicked"
                );
            }
        }
    }
}

pub struct Command {
    id: Uuid,
    kind: CommandKind,
    state: CommandState,
    listeners: Vec<CompletionListener>,
    outcome: Option<CommandOutcome>,
    created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: CommandState::Pending,
            listeners: Vec::new(),
            outcome: None,
            created_at: Utc::now(),
        }
    }

    pub fn add(watches: Vec<WatchDefinition>, target: TransitionTarget) -> Self {
        Self::new(CommandKind::Add { watches, target })
    }

    pub fn remove(ids: Vec<String>) -> Self {
        Self::new(CommandKind::Remove { ids })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn outcome(&self) -> Option<&CommandOutcome> {
        self.outcome.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Register a listener called exactly once when the command finishes.
    /// Ignored once the command has completed.
    pub fn add_completion_listener<F>(&mut self, listener: F)
    where
        F: FnOnce(&CommandOutcome) + Send + 'static,
    {
        if self.state.is_terminal() {
            debug!(command_id = %self.id, "Listener added to completed command ignored");
            return;
        }
        self.listeners.push(Box::new(listener));
    }

    /// Listener that forwards the outcome to a oneshot receiver
    pub fn completion(&mut self) -> oneshot::Receiver<CommandOutcome> {
        let (tx, rx) = oneshot::channel();
        self.add_completion_listener(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        rx
    }

    fn apply(&mut self, event: &CommandEvent) -> bool {
        match determine_target_state(self.state, event) {
            Ok(target) => {
                debug!(
                    command_id = %self.id,
                    kind = self.kind.name(),
                    from = %self.state,
                    to = %target,
                    event = event.event_type(),
                    terminal = event.is_terminal(),
                    error = event.error_message(),
                    "Command transition"
                );
                self.state = target;
                true
            }
            Err(error) => {
                debug!(command_id = %self.id, %error, "Command event ignored");
                false
            }
        }
    }

    /// Hand the command the executor's session. Only acts on a pending command.
    pub(crate) fn execute(&mut self, session: &ConnectionSession) -> ExecuteStep {
        if self.state != CommandState::Pending {
            return ExecuteStep::Ignored;
        }

        if session.is_connected() {
            self.apply(&CommandEvent::SessionConnected);
            return ExecuteStep::Ready;
        }

        session.connect();
        self.apply(&CommandEvent::Execute);
        ExecuteStep::AwaitingConnection
    }

    /// Session came up; returns `true` when the operation should start
    pub(crate) fn on_session_connected(&mut self) -> bool {
        self.state == CommandState::Connecting && self.apply(&CommandEvent::SessionConnected)
    }

    /// Finish the command: disconnect the session and hand back its listeners.
    /// Returns `None` if the outcome does not fit the current state.
    pub(crate) fn complete(
        &mut self,
        session: &ConnectionSession,
        outcome: CommandOutcome,
    ) -> Option<CompletedCommand> {
        if !self.apply(&outcome.as_event()) {
            return None;
        }

        session.disconnect();
        self.outcome = Some(outcome.clone());

        Some(CompletedCommand {
            id: self.id,
            kind: self.kind.name(),
            outcome,
            listeners: std::mem::take(&mut self.listeners),
        })
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("outcome", &self.outcome)
            .finish()
    }
}
