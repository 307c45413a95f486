//! Durable watch store on sqlite.
//!
//! One row per watch: the id, the definition as a JSON document and the time it
//! was last written. `put` is an upsert so re-adding an id replaces it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use super::{DatabaseMigrations, StoreResult, WatchListStore};
use crate::config::StoreConfig;
use crate::logging::log_store_operation;
use crate::models::WatchDefinition;

#[derive(Debug, Clone)]
pub struct SqliteWatchListStore {
    pool: SqlitePool,
}

impl SqliteWatchListStore {
    /// Open (creating if missing) the database named by `config` and migrate it
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        Self::connect_url(&config.database_url, config.max_connections).await
    }

    pub async fn connect_url(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        DatabaseMigrations::run_all(&pool).await?;
        debug!(database_url = database_url, "Watch store connected");

        Ok(Self { pool })
    }

    /// Use an existing pool; migrations still run
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        DatabaseMigrations::run_all(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    fn decode(data: &str) -> StoreResult<WatchDefinition> {
        Ok(serde_json::from_str(data)?)
    }
}

#[async_trait]
impl WatchListStore for SqliteWatchListStore {
    async fn get_all(&self) -> StoreResult<Vec<WatchDefinition>> {
        let started = Instant::now();
        let rows = sqlx::query("SELECT data FROM watch_definitions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let definitions = rows
            .iter()
            .map(|row| Self::decode(&row.try_get::<String, _>("data")?))
            .collect::<StoreResult<Vec<_>>>()?;

        log_store_operation(
            "get_all",
            definitions.len(),
            "ok",
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        Ok(definitions)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<WatchDefinition>> {
        let row = sqlx::query("SELECT data FROM watch_definitions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::decode(&row.try_get::<String, _>("data")?))
            .transpose()
    }

    async fn put(&self, definition: &WatchDefinition) -> StoreResult<()> {
        let started = Instant::now();
        let data = serde_json::to_string(definition)?;

        sqlx::query(
            r#"
INSERT INTO watch_definitions (id, data, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
"#,
        )
        .bind(&definition.id)
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        log_store_operation(
            "put",
            1,
            "ok",
            Some(started.elapsed().as_millis() as u64),
            Some(&definition.id),
        );
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM watch_definitions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let existed = result.rows_affected() > 0;
        log_store_operation(
            "remove",
            usize::from(existed),
            if existed { "ok" } else { "absent" },
            None,
            Some(id),
        );
        Ok(existed)
    }

    async fn ids(&self) -> StoreResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM watch_definitions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
