use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{StoreResult, WatchListStore};
use crate::models::WatchDefinition;

/// Process-local watch store; contents are lost with the process
#[derive(Debug, Default)]
pub struct InMemoryWatchListStore {
    watches: RwLock<HashMap<String, WatchDefinition>>,
}

impl InMemoryWatchListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, as found after a restart
    pub fn with_watches(definitions: impl IntoIterator<Item = WatchDefinition>) -> Self {
        let watches = definitions
            .into_iter()
            .map(|definition| (definition.id.clone(), definition))
            .collect();
        Self {
            watches: RwLock::new(watches),
        }
    }

    pub fn len(&self) -> usize {
        self.watches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.read().is_empty()
    }
}

#[async_trait]
impl WatchListStore for InMemoryWatchListStore {
    async fn get_all(&self) -> StoreResult<Vec<WatchDefinition>> {
        let mut all: Vec<_> = self.watches.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<WatchDefinition>> {
        Ok(self.watches.read().get(id).cloned())
    }

    async fn put(&self, definition: &WatchDefinition) -> StoreResult<()> {
        self.watches
            .write()
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        Ok(self.watches.write().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins_and_ordering() {
        let store = InMemoryWatchListStore::new();
        store.put(&WatchDefinition::new("b", 2.0, 2.0, 50.0)).await.unwrap();
        store.put(&WatchDefinition::new("a", 1.0, 1.0, 100.0)).await.unwrap();
        store.put(&WatchDefinition::new("a", 1.0, 1.0, 300.0)).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(
            all.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(all[0].radius, 300.0);
        assert_eq!(store.ids().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let store = InMemoryWatchListStore::with_watches([WatchDefinition::new("a", 1.0, 1.0, 10.0)]);
        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert!(store.is_empty());
    }
}
