mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use geofencer_core::config::GeofencerConfig;
use geofencer_core::database::{SqliteWatchListStore, WatchListStore};
use geofencer_core::models::{NotificationPayload, TransitionType, WatchDefinition};
use geofencer_core::orchestration::GeofencerSystem;
use geofencer_core::test_utils::ScriptedGeofencingService;
use tempfile::TempDir;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("watches.db").display())
}

#[tokio::test]
async fn test_watches_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    let mut office = WatchDefinition::new("office", 40.7, -74.0, 120.0);
    office.transition_type = TransitionType::BOTH;
    office.notification = Some(NotificationPayload {
        title: Some("Arrived".to_string()),
        ..NotificationPayload::default()
    });

    {
        let store = SqliteWatchListStore::connect_url(&url, 1).await.unwrap();
        store.put(&office).await.unwrap();
        store.put(&WatchDefinition::new("home", 52.5, 13.4, 80.0)).await.unwrap();
        assert!(store.remove("home").await.unwrap());
        store.close().await;
    }

    let reopened = SqliteWatchListStore::connect_url(&url, 1).await.unwrap();
    assert_eq!(reopened.get_all().await.unwrap(), vec![office.clone()]);
    assert_eq!(reopened.find_by_id("office").await.unwrap(), Some(office));
    assert_eq!(reopened.find_by_id("home").await.unwrap(), None);
    reopened.close().await;
}

#[tokio::test]
async fn test_put_replaces_by_id_across_reopen() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    {
        let store = SqliteWatchListStore::connect_url(&url, 1).await.unwrap();
        store.put(&WatchDefinition::new("a", 1.0, 1.0, 100.0)).await.unwrap();
        store.put(&WatchDefinition::new("a", 9.0, 9.0, 900.0)).await.unwrap();
        store.close().await;
    }

    let reopened = SqliteWatchListStore::connect_url(&url, 1).await.unwrap();
    let all = reopened.get_all().await.unwrap();
    assert_eq!(all, vec![WatchDefinition::new("a", 9.0, 9.0, 900.0)]);
    reopened.close().await;
}

#[tokio::test]
async fn test_restore_on_boot_reregisters_stored_watches() {
    let dir = TempDir::new().unwrap();
    let mut config = GeofencerConfig::default();
    config.store.database_url = database_url(&dir);

    {
        let store = SqliteWatchListStore::connect(&config.store).await.unwrap();
        for watch in numbered_watches(3) {
            store.put(&watch).await.unwrap();
        }
        store.close().await;
    }

    let service = Arc::new(ScriptedGeofencingService::new());
    let system = GeofencerSystem::restore_on_boot(&config, service.clone())
        .await
        .unwrap();

    assert!(wait_until(Duration::from_secs(1), || service.registered().len() == 1).await);
    let restored: Vec<String> = service.registered()[0]
        .iter()
        .map(|geofence| geofence.request_id.clone())
        .collect();
    assert_eq!(restored, vec!["watch-000", "watch-001", "watch-002"]);
    assert_eq!(system.orchestrator().executor().stats().enqueued, 1);
    assert_eq!(system.orchestrator().list_watches().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_restore_on_boot_with_empty_database_enqueues_nothing() {
    let dir = TempDir::new().unwrap();
    let mut config = GeofencerConfig::default();
    config.store.database_url = database_url(&dir);

    let service = Arc::new(ScriptedGeofencingService::new());
    let system = GeofencerSystem::restore_on_boot(&config, service.clone())
        .await
        .unwrap();

    assert_eq!(system.orchestrator().executor().stats().enqueued, 0);
    assert_eq!(service.connect_calls(), 0);
}

#[tokio::test]
async fn test_system_writes_through_to_disk() {
    let dir = TempDir::new().unwrap();
    let mut config = GeofencerConfig::default();
    config.store.database_url = database_url(&dir);

    let service = Arc::new(ScriptedGeofencingService::new());
    let system = GeofencerSystem::bootstrap(&config, service).await.unwrap();
    let ticket = system
        .orchestrator()
        .add_watches_tracked(scenario_watches())
        .await
        .unwrap();
    assert!(within_a_second(ticket.wait()).await.unwrap().is_success());

    let reader = SqliteWatchListStore::connect(&config.store).await.unwrap();
    assert_eq!(ids_of(&reader.get_all().await.unwrap()), vec!["a", "b"]);
    reader.close().await;
}
