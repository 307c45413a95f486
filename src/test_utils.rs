//! # Test Utilities
//!
//! Programmable stand-ins for the two external collaborators: a scripted
//! geofencing service with controllable connect/operation outcomes and call
//! recording, and a watch store that fails on demand.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::database::{InMemoryWatchListStore, StoreError, StoreResult, WatchListStore};
use crate::models::WatchDefinition;
use crate::services::{Geofence, GeofencingService, ServiceError, TransitionTarget};

/// Result code used when an operation reaches a disconnected client
pub const NOT_CONNECTED_CODE: i32 = 17;

/// How `connect` resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectBehavior {
    #[default]
    Succeed,
    /// Fail with the given platform result code
    Fail(i32),
    /// Never resolve
    Hang,
}

/// How register/unregister resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationBehavior {
    #[default]
    Succeed,
    Reject(i32),
    Hang,
}

/// One recorded call against the scripted service
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Connect,
    Disconnect,
    Register(Vec<String>),
    Unregister(Vec<String>),
}

#[derive(Debug)]
struct ScriptState {
    available: bool,
    connect_behavior: ConnectBehavior,
    hold_connections: bool,
    connect_delays: VecDeque<Duration>,
    connected: bool,
    require_connection: bool,
    operation_behavior: OperationBehavior,
    scripted_operations: VecDeque<OperationBehavior>,
    operation_delay: Option<Duration>,
    calls: Vec<ServiceCall>,
    registered: Vec<Vec<Geofence>>,
    unregistered: Vec<Vec<String>>,
    targets: Vec<TransitionTarget>,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            available: true,
            connect_behavior: ConnectBehavior::default(),
            hold_connections: false,
            connect_delays: VecDeque::new(),
            connected: false,
            require_connection: false,
            operation_behavior: OperationBehavior::default(),
            scripted_operations: VecDeque::new(),
            operation_delay: None,
            calls: Vec::new(),
            registered: Vec::new(),
            unregistered: Vec::new(),
            targets: Vec::new(),
        }
    }
}

/// Fake external geofencing service
#[derive(Debug, Default)]
pub struct ScriptedGeofencingService {
    state: Mutex<ScriptState>,
    connection_gate: Notify,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedGeofencingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        self.state.lock().connect_behavior = behavior;
    }

    /// Make every connect wait for a [`Self::release_connection`] permit
    pub fn hold_connections(&self) {
        self.state.lock().hold_connections = true;
    }

    /// Let one held (or the next) connect proceed
    pub fn release_connection(&self) {
        self.connection_gate.notify_one();
    }

    /// Delay for the next connect only; later connects are not delayed
    pub fn push_connect_delay(&self, delay: Duration) {
        self.state.lock().connect_delays.push_back(delay);
    }

    /// Behave like a single platform client: register/unregister are rejected
    /// unless the most recent connect succeeded and no disconnect followed it
    pub fn require_connection(&self) {
        self.state.lock().require_connection = true;
    }

    /// Whether the client is currently connected
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Default behaviour once the scripted queue is empty
    pub fn set_operation_behavior(&self, behavior: OperationBehavior) {
        self.state.lock().operation_behavior = behavior;
    }

    /// Behaviour for the next unscripted operation only
    pub fn push_operation_behavior(&self, behavior: OperationBehavior) {
        self.state.lock().scripted_operations.push_back(behavior);
    }

    pub fn set_operation_delay(&self, delay: Duration) {
        self.state.lock().operation_delay = Some(delay);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().calls.clone()
    }

    /// Geofence sets passed to `register_geofences`, in call order
    pub fn registered(&self) -> Vec<Vec<Geofence>> {
        self.state.lock().registered.clone()
    }

    /// Id lists passed to `unregister_geofences`, in call order
    pub fn unregistered(&self) -> Vec<Vec<String>> {
        self.state.lock().unregistered.clone()
    }

    pub fn transition_targets(&self) -> Vec<TransitionTarget> {
        self.state.lock().targets.clone()
    }

    /// Highest number of register/unregister calls observed running at once
    pub fn max_concurrent_operations(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self, call: &ServiceCall) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if state.require_connection && !state.connected {
            state.calls.push(call.clone());
            return Err(ServiceError::rejected(NOT_CONNECTED_CODE, "client not connected"));
        }
        Ok(())
    }

    fn begin_operation(&self, call: ServiceCall) -> (OperationBehavior, Option<Duration>, InFlightGuard<'_>) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let mut state = self.state.lock();
        state.calls.push(call);
        let behavior = state
            .scripted_operations
            .pop_front()
            .unwrap_or(state.operation_behavior);
        (behavior, state.operation_delay, InFlightGuard(&self.in_flight))
    }

    async fn resolve_operation(
        behavior: OperationBehavior,
        delay: Option<Duration>,
    ) -> Result<(), ServiceError> {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match behavior {
            OperationBehavior::Succeed => Ok(()),
            OperationBehavior::Reject(code) => {
                Err(ServiceError::rejected(code, "scripted rejection"))
            }
            OperationBehavior::Hang => futures::future::pending().await,
        }
    }
}

#[async_trait]
impl GeofencingService for ScriptedGeofencingService {
    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    async fn connect(&self) -> Result<(), ServiceError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let (hold, delay, behavior) = {
            let mut state = self.state.lock();
            state.calls.push(ServiceCall::Connect);
            (
                state.hold_connections,
                state.connect_delays.pop_front(),
                state.connect_behavior,
            )
        };

        if hold {
            self.connection_gate.notified().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match behavior {
            ConnectBehavior::Succeed => {
                self.state.lock().connected = true;
                Ok(())
            }
            ConnectBehavior::Fail(code) => Err(ServiceError::connection_failed(
                code,
                "scripted connection failure",
            )),
            ConnectBehavior::Hang => futures::future::pending().await,
        }
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.connected = false;
        state.calls.push(ServiceCall::Disconnect);
    }

    async fn register_geofences(
        &self,
        geofences: Vec<Geofence>,
        target: &TransitionTarget,
    ) -> Result<(), ServiceError> {
        let ids = geofences.iter().map(|g| g.request_id.clone()).collect();
        let call = ServiceCall::Register(ids);
        self.ensure_connected(&call)?;
        let (behavior, delay, _guard) = self.begin_operation(call);
        {
            let mut state = self.state.lock();
            state.registered.push(geofences);
            state.targets.push(target.clone());
        }
        Self::resolve_operation(behavior, delay).await
    }

    async fn unregister_geofences(&self, ids: Vec<String>) -> Result<(), ServiceError> {
        let call = ServiceCall::Unregister(ids.clone());
        self.ensure_connected(&call)?;
        let (behavior, delay, _guard) = self.begin_operation(call);
        self.state.lock().unregistered.push(ids);
        Self::resolve_operation(behavior, delay).await
    }
}

/// In-memory store whose writes, deletes or reads fail on demand
#[derive(Debug, Default)]
pub struct FlakyWatchListStore {
    inner: InMemoryWatchListStore,
    failing_puts: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
    fail_reads: Mutex<bool>,
}

impl FlakyWatchListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watches(definitions: impl IntoIterator<Item = WatchDefinition>) -> Self {
        Self {
            inner: InMemoryWatchListStore::with_watches(definitions),
            ..Self::default()
        }
    }

    pub fn fail_put_for(&self, id: impl Into<String>) {
        self.failing_puts.lock().insert(id.into());
    }

    pub fn fail_remove_for(&self, id: impl Into<String>) {
        self.failing_removes.lock().insert(id.into());
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    fn check_reads(&self) -> StoreResult<()> {
        if *self.fail_reads.lock() {
            return Err(StoreError::Unavailable("scripted read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchListStore for FlakyWatchListStore {
    async fn get_all(&self) -> StoreResult<Vec<WatchDefinition>> {
        self.check_reads()?;
        self.inner.get_all().await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<WatchDefinition>> {
        self.check_reads()?;
        self.inner.find_by_id(id).await
    }

    async fn put(&self, definition: &WatchDefinition) -> StoreResult<()> {
        if self.failing_puts.lock().contains(&definition.id) {
            return Err(StoreError::Unavailable(format!(
                "scripted write failure for '{}'",
                definition.id
            )));
        }
        self.inner.put(definition).await
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        if self.failing_removes.lock().contains(id) {
            return Err(StoreError::Unavailable(format!(
                "scripted delete failure for '{id}'"
            )));
        }
        self.inner.remove(id).await
    }
}
