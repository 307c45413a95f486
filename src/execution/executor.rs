//! # Command Executor
//!
//! FIFO queue of [`Command`]s sharing one [`ConnectionSession`]. At most one
//! command holds the session at a time; when it completes its listeners run and
//! the next queued command starts.
//!
//! Every session, operation and timeout result arrives as a [`PipelineEvent`]
//! from a runtime task and is applied by [`ExecutorInner::handle_event`] under the
//! queue lock. Listeners are always invoked with the lock released, so they may
//! enqueue further commands.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use super::command::{Command, CommandFailure, CommandOutcome, CompletedCommand, ExecuteStep};
use super::session::{ConnectionSession, SessionEvent};
use crate::config::ExecutorConfig;
use crate::error::{GeofencerError, Result};
use crate::logging::log_command_operation;
use crate::services::{GeofencingService, ServiceError};
use crate::state_machine::{CommandState, SessionStatus};

/// Snapshot of the command holding the session
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCommand {
    pub id: Uuid,
    pub kind: &'static str,
    pub state: CommandState,
    pub operand_len: usize,
}

/// Lifetime counters for one executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub enqueued: u64,
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct ExecutorCounters {
    enqueued: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug)]
enum PipelineEvent {
    Session(SessionEvent),
    OperationFinished {
        command_id: Uuid,
        result: std::result::Result<(), ServiceError>,
    },
    TimedOut {
        command_id: Uuid,
        after: Duration,
    },
}

#[derive(Debug, Default)]
struct ExecutorQueue {
    pending: VecDeque<Command>,
    active: Option<Command>,
    executing: bool,
    /// Service call of the active command; aborted when the command finishes
    operation_task: Option<JoinHandle<()>>,
    timeout_task: Option<JoinHandle<()>>,
}

struct ExecutorInner {
    id: Uuid,
    weak_self: Weak<ExecutorInner>,
    runtime: Handle,
    session: ConnectionSession,
    queue: Mutex<ExecutorQueue>,
    command_timeout: Option<Duration>,
    span: Span,
    counters: ExecutorCounters,
}

/// Serialized command queue owning the service session
pub struct CommandExecutor {
    inner: Arc<ExecutorInner>,
}

impl CommandExecutor {
    /// Create an executor on the current tokio runtime
    pub fn new(service: Arc<dyn GeofencingService>, config: &ExecutorConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| GeofencerError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self::with_runtime(service, config, runtime))
    }

    /// Create an executor whose tasks run on `runtime`; `enqueue` may then be
    /// called from any thread
    pub fn with_runtime(
        service: Arc<dyn GeofencingService>,
        config: &ExecutorConfig,
        runtime: Handle,
    ) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("command_executor", executor_id = %id);

        let inner = Arc::new_cyclic(|weak: &Weak<ExecutorInner>| {
            let listener_target = weak.clone();
            let session = ConnectionSession::new(service, runtime.clone(), move |event| {
                if let Some(inner) = listener_target.upgrade() {
                    inner.handle_event(PipelineEvent::Session(event));
                }
            });

            ExecutorInner {
                id,
                weak_self: weak.clone(),
                runtime,
                session,
                queue: Mutex::new(ExecutorQueue::default()),
                command_timeout: config.command_timeout(),
                span,
                counters: ExecutorCounters::default(),
            }
        });

        info!(
            parent: &inner.span,
            command_timeout_ms = config.command_timeout_ms,
            "Command executor created"
        );

        Self { inner }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Append a command; starts it immediately when the executor is idle
    pub fn enqueue(&self, command: Command) -> Uuid {
        self.inner.enqueue(command)
    }

    pub fn is_executing(&self) -> bool {
        self.inner.queue.lock().executing
    }

    /// Commands waiting behind the active one
    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().pending.len()
    }

    pub fn active_command(&self) -> Option<ActiveCommand> {
        let queue = self.inner.queue.lock();
        queue.active.as_ref().map(|command| ActiveCommand {
            id: command.id(),
            kind: command.kind().name(),
            state: command.state(),
            operand_len: command.kind().operand_len(),
        })
    }

    pub fn session_status(&self) -> SessionStatus {
        self.inner.session.status()
    }

    pub fn stats(&self) -> ExecutorStats {
        let counters = &self.inner.counters;
        ExecutorStats {
            enqueued: counters.enqueued.load(Ordering::Relaxed),
            started: counters.started.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("id", &self.inner.id)
            .field("session", &self.inner.session)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ExecutorInner {
    fn enqueue(&self, command: Command) -> Uuid {
        let _entered = self.span.enter();
        let command_id = command.id();
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        let mut queue = self.queue.lock();
        debug!(
            command_id = %command_id,
            kind = command.kind().name(),
            operand_len = command.kind().operand_len(),
            queued = queue.pending.len() + 1,
            "Command enqueued"
        );
        queue.pending.push_back(command);

        if !queue.executing {
            self.advance(&mut queue);
        }

        command_id
    }

    /// Clear the executing flag and start the head of the queue, if any
    fn advance(&self, queue: &mut ExecutorQueue) {
        queue.executing = false;
        queue.active = None;
        if let Some(operation) = queue.operation_task.take() {
            operation.abort();
        }
        if let Some(timer) = queue.timeout_task.take() {
            timer.abort();
        }

        let Some(mut command) = queue.pending.pop_front() else {
            debug!("Command queue drained");
            return;
        };

        queue.executing = true;
        self.counters.started.fetch_add(1, Ordering::Relaxed);

        if command.execute(&self.session) == ExecuteStep::Ready {
            queue.operation_task = Some(self.spawn_operation(&command));
        }
        log_command_operation(
            "start",
            command.id(),
            command.kind().name(),
            &command.state().to_string(),
            None,
        );
        queue.timeout_task = self.arm_timeout(command.id());
        queue.active = Some(command);
    }

    fn spawn_operation(&self, command: &Command) -> JoinHandle<()> {
        let command_id = command.id();
        let operation = command.kind().perform_against_service(self.session.service());
        let executor = self.weak_self.clone();

        debug!(command_id = %command_id, kind = command.kind().name(), "Starting service operation");

        self.runtime.spawn(
            async move {
                let result = operation.await;
                if let Some(inner) = executor.upgrade() {
                    inner.handle_event(PipelineEvent::OperationFinished { command_id, result });
                }
            }
            .instrument(self.span.clone()),
        )
    }

    fn arm_timeout(&self, command_id: Uuid) -> Option<JoinHandle<()>> {
        let after = self.command_timeout?;
        let executor = self.weak_self.clone();

        Some(self.runtime.spawn(
            async move {
                tokio::time::sleep(after).await;
                if let Some(inner) = executor.upgrade() {
                    inner.handle_event(PipelineEvent::TimedOut { command_id, after });
                }
            }
            .instrument(self.span.clone()),
        ))
    }

    /// Apply one pipeline event to the active command
    fn handle_event(&self, event: PipelineEvent) {
        let _entered = self.span.enter();

        let completed = {
            let mut guard = self.queue.lock();
            let queue = &mut *guard;
            let Some(active) = queue.active.as_mut() else {
                debug!(?event, "No active command, dropping event");
                return;
            };

            match event {
                PipelineEvent::Session(SessionEvent::Connected { attempt }) => {
                    debug!(attempt, command_id = %active.id(), "Session connected");
                    if active.on_session_connected() {
                        queue.operation_task = Some(self.spawn_operation(active));
                    }
                    None
                }
                PipelineEvent::Session(SessionEvent::Failed { attempt, error }) => {
                    debug!(attempt, command_id = %active.id(), %error, "Session failed to connect");
                    active.complete(
                        &self.session,
                        CommandOutcome::Failed(CommandFailure::ConnectionFailed(error.to_string())),
                    )
                }
                PipelineEvent::OperationFinished { command_id, result }
                    if command_id == active.id() =>
                {
                    // reporting from inside that task; nothing left to cancel
                    queue.operation_task = None;
                    let outcome = match result {
                        Ok(()) => CommandOutcome::Succeeded,
                        Err(error) => {
                            CommandOutcome::Failed(CommandFailure::Rejected(error.to_string()))
                        }
                    };
                    active.complete(&self.session, outcome)
                }
                PipelineEvent::TimedOut { command_id, after } if command_id == active.id() => {
                    queue.timeout_task = None;
                    active.complete(
                        &self.session,
                        CommandOutcome::Failed(CommandFailure::TimedOut(after)),
                    )
                }
                stale => {
                    debug!(event = ?stale, active = %active.id(), "Dropping stale event");
                    None
                }
            }
        };

        if let Some(completed) = completed {
            self.finish(completed);
        }
    }

    fn finish(&self, completed: CompletedCommand) {
        let counter = if completed.outcome.is_success() {
            &self.counters.succeeded
        } else {
            &self.counters.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let details = completed.outcome.failure().map(ToString::to_string);
        log_command_operation(
            "complete",
            completed.id,
            completed.kind,
            if completed.outcome.is_success() {
                "succeeded"
            } else {
                "failed"
            },
            details.as_deref(),
        );

        completed.notify_listeners();

        let mut queue = self.queue.lock();
        self.advance(&mut queue);
    }
}

impl Drop for ExecutorInner {
    fn drop(&mut self) {
        let queue = self.queue.get_mut();
        if let Some(operation) = queue.operation_task.take() {
            operation.abort();
        }
        if let Some(timer) = queue.timeout_task.take() {
            timer.abort();
        }
        let in_flight = queue
            .active
            .as_ref()
            .is_some_and(|command| command.state().is_active());
        if in_flight || !queue.pending.is_empty() {
            debug!(
                executor_id = %self.id,
                in_flight,
                dropped = queue.pending.len() + usize::from(queue.active.is_some()),
                "Executor dropped with unfinished commands"
            );
        }
        self.session.disconnect();
    }
}
