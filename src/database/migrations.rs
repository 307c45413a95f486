//! # Schema Migrations
//!
//! Versioned schema for the sqlite watch store. Migrations are compiled in and
//! applied in order; applied versions are tracked in
//! `geofencer_schema_migrations` so connecting repeatedly is a no-op.

use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};

/// Represents a single embedded migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: &'static str,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "20250101000000",
    name: "create_watch_definitions",
    sql: r#"
CREATE TABLE IF NOT EXISTS watch_definitions (
    id TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
}];

pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Apply every migration not yet recorded
    pub async fn run_all(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        Self::ensure_migration_table(pool).await?;
        let applied = Self::get_applied_migrations(pool).await?;

        for migration in Self::pending(&applied) {
            info!(
                version = migration.version,
                name = migration.name,
                "🗄️ Applying schema migration"
            );
            sqlx::raw_sql(migration.sql).execute(pool).await?;
            Self::record_migration(pool, migration.version).await?;
        }

        debug!(total = MIGRATIONS.len(), "Schema up to date");
        Ok(())
    }

    pub fn migrations() -> &'static [Migration] {
        MIGRATIONS
    }

    fn pending(applied: &HashSet<String>) -> impl Iterator<Item = &'static Migration> + '_ {
        MIGRATIONS
            .iter()
            .filter(move |migration| !applied.contains(migration.version))
    }

    async fn ensure_migration_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            r#"
CREATE TABLE IF NOT EXISTS geofencer_schema_migrations (
    version TEXT PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn get_applied_migrations(pool: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT version FROM geofencer_schema_migrations")
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("version"))
            .collect()
    }

    async fn record_migration(pool: &SqlitePool, version: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO geofencer_schema_migrations (version) VALUES (?1)")
            .bind(version)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ordered_and_unique() {
        let versions: Vec<_> = DatabaseMigrations::migrations()
            .iter()
            .map(|migration| migration.version)
            .collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[tokio::test]
    async fn test_run_all_is_idempotent() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DatabaseMigrations::run_all(&pool).await.unwrap();
        DatabaseMigrations::run_all(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM geofencer_schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}
