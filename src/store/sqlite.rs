//! SQLite key-value backend.
//!
//! The database file is the store every tab and process shares. Each write runs
//! in one transaction together with the revision bump, so readers never see a
//! half-written document.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};

use super::{KeyValueStore, StoredValue};
use crate::errors::StoreError;

/// Key-value store persisted in a SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the store file and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        tracing::debug!("Opened SQLite store at {:?}", db_path);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Create tables if they don't exist.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Increment the revision inside the caller's transaction.
async fn bump_revision(tx: &mut Transaction<'_, Sqlite>) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn current_version(
    tx: &mut Transaction<'_, Sqlite>,
    key: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT version FROM entries WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map_or(0, |r| r.get("version")))
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let row = sqlx::query("SELECT value, version FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| StoredValue {
            value: row.get("value"),
            version: row.get("version"),
        }))
    }

    async fn put(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"INSERT INTO entries (key, value, version, updated_at) VALUES (?, ?, 1, ?)
               ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   version = entries.version + 1,
                   updated_at = excluded.updated_at
               RETURNING version"#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(row.get("version"))
    }

    async fn put_if_version(
        &self,
        key: &str,
        expected_version: i64,
        value: &str,
    ) -> Result<i64, StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Conditional statements so a concurrent writer cannot slip in between check and write
        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO entries (key, value, version, updated_at) VALUES (?, ?, 1, ?) ON CONFLICT(key) DO NOTHING",
            )
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                "UPDATE entries SET value = ?, version = version + 1, updated_at = ? WHERE key = ? AND version = ?",
            )
            .bind(value)
            .bind(&now)
            .bind(key)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?
        };

        if result.rows_affected() == 0 {
            let current = current_version(&mut tx, key).await?;
            tx.rollback().await?;
            return Err(StoreError::Conflict {
                message: format!(
                    "Version mismatch on {}: expected {}, current {}",
                    key, expected_version, current
                ),
                current_version: current,
            });
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(expected_version + 1)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM entries WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            bump_revision(&mut tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn revision(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_versions_and_revision() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();

        assert!(store.get("hackmap-teams").await.unwrap().is_none());
        assert_eq!(store.revision().await.unwrap(), 0);

        assert_eq!(store.put("hackmap-teams", "[]").await.unwrap(), 1);
        assert_eq!(store.put("hackmap-teams", "[1]").await.unwrap(), 2);

        let stored = store.get("hackmap-teams").await.unwrap().unwrap();
        assert_eq!(stored.value, "[1]");
        assert_eq!(stored.version, 2);
        assert_eq!(store.revision().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();

        assert_eq!(store.put_if_version("k", 0, "a").await.unwrap(), 1);
        assert!(matches!(
            store.put_if_version("k", 0, "b").await,
            Err(StoreError::Conflict {
                current_version: 1,
                ..
            })
        ));
        assert_eq!(store.put_if_version("k", 1, "c").await.unwrap(), 2);
        assert_eq!(store.get("k").await.unwrap().unwrap().value, "c");

        // Failed writes leave the revision alone
        assert_eq!(store.revision().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.sqlite");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.put("hackmap-user", "{}").await.unwrap();
            store.put("hackmap-teams", "[]").await.unwrap();
            store.delete("hackmap-user").await.unwrap();
            store.delete("hackmap-user").await.unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert!(reopened.get("hackmap-user").await.unwrap().is_none());
        assert!(reopened.get("hackmap-teams").await.unwrap().is_some());
        assert_eq!(reopened.revision().await.unwrap(), 3);
    }
}
