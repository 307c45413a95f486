use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use geofencer_core::config::ExecutorConfig;
use geofencer_core::database::WatchListStore;
use geofencer_core::execution::CommandExecutor;
use geofencer_core::models::WatchDefinition;
use geofencer_core::orchestration::WatchListOrchestrator;
use geofencer_core::services::TransitionTarget;
use geofencer_core::test_utils::ScriptedGeofencingService;

pub const TEST_RECEIVER: &str = "GeofencerOnTransitionReceived";

/// The two watches used by the end-to-end scenario
pub fn scenario_watches() -> Vec<WatchDefinition> {
    vec![
        WatchDefinition::new("a", 1.0, 1.0, 100.0),
        WatchDefinition::new("b", 2.0, 2.0, 50.0),
    ]
}

pub fn numbered_watches(count: usize) -> Vec<WatchDefinition> {
    (0..count)
        .map(|i| WatchDefinition::new(format!("watch-{i:03}"), i as f64 * 0.1, i as f64 * 0.1, 100.0))
        .collect()
}

pub fn orchestrator_with(
    store: Arc<dyn WatchListStore>,
    service: Arc<ScriptedGeofencingService>,
    config: ExecutorConfig,
) -> WatchListOrchestrator {
    let executor = CommandExecutor::new(service, &config).expect("test runs inside a runtime");
    WatchListOrchestrator::new(store, Arc::new(executor), TransitionTarget::new(TEST_RECEIVER))
}

pub fn ids_of(definitions: &[WatchDefinition]) -> Vec<String> {
    definitions.iter().map(|d| d.id.clone()).collect()
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Await `future`, failing the test if it takes longer than a second
pub async fn within_a_second<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(1), future)
        .await
        .expect("operation did not finish within a second")
}
