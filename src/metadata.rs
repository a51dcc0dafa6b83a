//! Metadata store for uploaded media.
//!
//! One row per stored file in the `arquivos` table. Every operation acquires
//! its own connection from the pool and returns it on every exit path.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info};

use crate::errors::{GalleryError, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS arquivos (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    nome      TEXT NOT NULL UNIQUE,
    tipo      TEXT NOT NULL,
    descricao TEXT NOT NULL DEFAULT '',
    data      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const SELECT_COLUMNS: &str = "SELECT id, nome, tipo, descricao, data FROM arquivos";

/// A stored media item as recorded in the database.
///
/// Serialized with the gallery's wire names.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: i64,
    #[serde(rename = "nome")]
    #[sqlx(rename = "nome")]
    pub stored_name: String,
    #[serde(rename = "tipo")]
    #[sqlx(rename = "tipo")]
    pub mime_type: String,
    #[serde(rename = "descricao")]
    #[sqlx(rename = "descricao")]
    pub description: String,
    #[serde(rename = "data")]
    #[sqlx(rename = "data")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Connects to `database_url` and ensures the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Opening metadata store at {}", database_url);

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Single-connection in-memory store, used by tests and `sqlite::memory:`.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory metadata store");
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Each in-memory connection is its own database, so the pool must
        // never hold more than one and never recycle it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts one record and returns its id.
    pub async fn insert(&self, stored_name: &str, mime_type: &str, description: &str) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO arquivos (nome, tipo, descricao, data) VALUES (?, ?, ?, ?)",
        )
        .bind(stored_name)
        .bind(mime_type)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All records in ascending id order, optionally restricted to MIME
    /// types starting with `type_filter` (case-sensitive).
    pub async fn list_all(&self, type_filter: Option<&str>) -> Result<Vec<FileRecord>> {
        let records = match type_filter {
            Some(prefix) => {
                let sql = format!(
                    "{SELECT_COLUMNS} WHERE substr(tipo, 1, length(?1)) = ?1 ORDER BY id ASC"
                );
                sqlx::query_as::<_, FileRecord>(&sql)
                    .bind(prefix)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC");
                sqlx::query_as::<_, FileRecord>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(records)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<FileRecord> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("File {id}")))
    }

    pub async fn find_by_stored_name(&self, stored_name: &str) -> Result<Option<FileRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE nome = ?");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(stored_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Removes one record. Zero affected rows means someone else got there
    /// first, which is reported as `NotFound`.
    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM arquivos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GalleryError::NotFound(format!("File {id}")));
        }
        Ok(())
    }

    /// Removes every record, returning how many were deleted.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM arquivos")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM arquivos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
