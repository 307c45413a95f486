//! # Watch-List Persistence
//!
//! The durable source of truth for watch definitions. The external service's
//! registered set is only a cache rebuilt from here on boot, so every
//! orchestrator mutation lands in the store before its command is queued.
//!
//! - [`SqliteWatchListStore`] - sqlx/sqlite backed, one JSON document per watch
//! - [`InMemoryWatchListStore`] - process-local map for tests and ephemeral hosts
//! - [`migrations`] - idempotent schema setup run at connect time

pub mod memory_store;
pub mod migrations;
pub mod sqlite_store;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::models::WatchDefinition;

pub use memory_store::InMemoryWatchListStore;
pub use migrations::DatabaseMigrations;
pub use sqlite_store::SqliteWatchListStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored watch could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Watch store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed CRUD over watch definitions; `put` replaces any record with the same id
#[async_trait]
pub trait WatchListStore: Send + Sync + fmt::Debug {
    /// All stored definitions, ordered by id
    async fn get_all(&self) -> StoreResult<Vec<WatchDefinition>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<WatchDefinition>>;

    async fn put(&self, definition: &WatchDefinition) -> StoreResult<()>;

    /// Delete by id; returns whether a record existed
    async fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Ids of all stored definitions, ordered
    async fn ids(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .map(|definition| definition.id)
            .collect())
    }
}
