//! # Connection Session
//!
//! The executor's single, reusable handle to the external geofencing service.
//! `connect` only starts a new attempt from `Disconnected`; calls made while an
//! attempt is in flight or the session is up are absorbed, and the in-flight
//! attempt's event answers all of them. Each real attempt produces exactly one
//! [`SessionEvent`], delivered from a runtime task.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument, Span};

use crate::services::{GeofencingService, ServiceError};
use crate::state_machine::SessionStatus;

/// Outcome of one connection attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected { attempt: u64 },
    Failed { attempt: u64, error: ServiceError },
}

type SessionListener = Arc<dyn Fn(SessionEvent) + Send + Sync>;

#[derive(Debug, Default)]
struct SessionShared {
    status: SessionStatus,
    /// Bumped on every attempt and on disconnect; results from older generations are dropped
    generation: u64,
    attempts_started: u64,
    /// In-flight connect; aborted when the attempt is superseded
    attempt_task: Option<JoinHandle<()>>,
}

pub struct ConnectionSession {
    service: Arc<dyn GeofencingService>,
    runtime: Handle,
    shared: Arc<Mutex<SessionShared>>,
    listener: SessionListener,
}

impl ConnectionSession {
    /// Create a disconnected session; `listener` receives one event per real attempt
    pub fn new<F>(service: Arc<dyn GeofencingService>, runtime: Handle, listener: F) -> Self
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        Self {
            service,
            runtime,
            shared: Arc::new(Mutex::new(SessionShared::default())),
            listener: Arc::new(listener),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status
    }

    pub fn is_connected(&self) -> bool {
        self.status() == SessionStatus::Connected
    }

    /// Number of attempts that actually reached the external service
    pub fn attempts_started(&self) -> u64 {
        self.shared.lock().attempts_started
    }

    pub fn service(&self) -> Arc<dyn GeofencingService> {
        Arc::clone(&self.service)
    }

    /// Start a connection attempt unless one is in flight or the session is up.
    ///
    /// Returns `true` when a new attempt was started.
    pub fn connect(&self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.status.accepts_connect() {
            debug!(status = %shared.status, "Connect absorbed by existing session state");
            return false;
        }
        shared.status = SessionStatus::Connecting;
        shared.generation += 1;
        shared.attempts_started += 1;
        let attempt = shared.generation;

        debug!(attempt, "Connecting to geofencing service");

        let service = Arc::clone(&self.service);
        let task_shared = Arc::clone(&self.shared);
        let listener = Arc::clone(&self.listener);

        // spawned under the lock so a concurrent disconnect always sees the handle
        let task = self.runtime.spawn(
            async move {
                let result = service.connect().await;
                let connected = result.is_ok();

                let event = {
                    let mut shared = task_shared.lock();
                    if shared.generation != attempt
                        || shared.status != SessionStatus::Connecting
                    {
                        // Only release the client when nothing newer owns it
                        if connected
                            && shared.status == SessionStatus::Disconnected
                            && shared.generation == attempt + 1
                        {
                            debug!(attempt, "Releasing late connection of superseded attempt");
                            service.disconnect();
                        } else {
                            debug!(attempt, connected, "Dropping result of superseded connection attempt");
                        }
                        None
                    } else {
                        shared.attempt_task = None;
                        match result {
                            Ok(()) => {
                                shared.status = SessionStatus::Connected;
                                Some(SessionEvent::Connected { attempt })
                            }
                            Err(error) => {
                                shared.status = SessionStatus::Disconnected;
                                Some(SessionEvent::Failed { attempt, error })
                            }
                        }
                    }
                };

                if let Some(event) = event {
                    listener(event);
                }
            }
            .instrument(Span::current()),
        );
        shared.attempt_task = Some(task);

        true
    }

    /// Drop back to `Disconnected`, releasing the service handle. Safe in any state.
    pub fn disconnect(&self) {
        let previous = {
            let mut shared = self.shared.lock();
            let previous = shared.status;
            if previous == SessionStatus::Connecting {
                shared.generation += 1;
            }
            if let Some(task) = shared.attempt_task.take() {
                task.abort();
            }
            shared.status = SessionStatus::Disconnected;
            previous
        };

        if previous != SessionStatus::Disconnected {
            debug!(previous = %previous, "Disconnecting from geofencing service");
            self.service.disconnect();
        }
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("ConnectionSession")
            .field("status", &shared.status)
            .field("generation", &shared.generation)
            .field("attempts_started", &shared.attempts_started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ConnectBehavior, ScriptedGeofencingService};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn session_with(
        service: Arc<ScriptedGeofencingService>,
    ) -> (ConnectionSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ConnectionSession::new(service, Handle::current(), move |event| {
            let _ = tx.send(event);
        });
        (session, rx)
    }

    #[tokio::test]
    async fn test_connect_success_fires_connected_once() {
        let service = Arc::new(ScriptedGeofencingService::new());
        let (session, mut events) = session_with(service.clone());

        assert!(session.connect());
        assert_eq!(session.status(), SessionStatus::Connecting);

        let event = events.recv().await.unwrap();
        assert_eq!(event, SessionEvent::Connected { attempt: 1 });
        assert!(session.is_connected());
        assert_eq!(service.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_while_connecting_or_connected_is_absorbed() {
        let service = Arc::new(ScriptedGeofencingService::new());
        service.hold_connections();
        let (session, mut events) = session_with(service.clone());

        assert!(session.connect());
        assert!(!session.connect());
        assert!(!session.connect());

        service.release_connection();
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Connected { .. }
        ));

        assert!(!session.connect());
        assert_eq!(service.connect_calls(), 1);
        assert_eq!(session.attempts_started(), 1);

        // no further events for the absorbed calls
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let service = Arc::new(ScriptedGeofencingService::new());
        service.set_connect_behavior(ConnectBehavior::Fail(8));
        let (session, mut events) = session_with(service.clone());

        session.connect();
        match events.recv().await.unwrap() {
            SessionEvent::Failed { attempt, error } => {
                assert_eq!(attempt, 1);
                assert!(matches!(error, ServiceError::ConnectionFailed { code: 8, .. }));
            }
            other => panic!("Expected failure event, got {other:?}"),
        }
        assert_eq!(session.status(), SessionStatus::Disconnected);

        // a fresh attempt is allowed after failure
        assert!(session.connect());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let service = Arc::new(ScriptedGeofencingService::new());
        let (session, mut events) = session_with(service.clone());

        session.disconnect();
        session.disconnect();
        assert_eq!(service.disconnect_calls(), 0);

        session.connect();
        events.recv().await.unwrap();
        session.disconnect();
        session.disconnect();
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(service.disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_supersedes_in_flight_attempt() {
        let service = Arc::new(ScriptedGeofencingService::new());
        service.hold_connections();
        let (session, mut events) = session_with(service.clone());

        session.connect();
        session.disconnect();
        service.release_connection();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(session.status(), SessionStatus::Disconnected);
        // the cancelled attempt never completes, so nothing is released twice
        assert_eq!(service.disconnect_calls(), 1);
        assert!(!service.is_connected());
    }

    #[tokio::test]
    async fn test_superseded_attempt_never_tears_down_newer_session() {
        let service = Arc::new(ScriptedGeofencingService::new());
        service.push_connect_delay(Duration::from_millis(80));
        let (session, mut events) = session_with(service.clone());

        assert!(session.connect());
        // let the first attempt reach the service before superseding it
        tokio::task::yield_now().await;
        assert_eq!(service.connect_calls(), 1);
        session.disconnect();
        assert!(session.connect());

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Connected { attempt: 3 }
        );

        // outlive the first attempt's connect delay
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(events.try_recv().is_err());
        assert!(session.is_connected());
        assert!(service.is_connected());
        assert_eq!(service.connect_calls(), 2);
        assert_eq!(service.disconnect_calls(), 1);
    }
}
