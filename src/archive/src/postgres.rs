//! PostgreSQL archive store

use crate::error::{ArchiveError, Result};
use crate::store::ArchiveStore;
use crate::types::{Archive, ArchiveFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::path::PathBuf;
use std::time::Duration;
use warden_vault::KeyId;

const SELECT_COLUMNS: &str = "id, archive_name, archive_type, file_path, file_size_bytes, \
     encrypted, encryption_key_id, source_agent, retention_days, access_level, metadata, \
     created_at, expires_at";

/// PostgreSQL store backed by the `archives` table
pub struct PostgresArchiveStore {
    pool: PgPool,
}

impl PostgresArchiveStore {
    /// Connect with a pooled connection
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| ArchiveError::Store(format!("Failed to connect to database: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        // Archive and grant migrations share one history table
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| ArchiveError::Store(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn archive_from_row(row: &PgRow) -> Result<Archive> {
    let decode = |e: sqlx::Error| ArchiveError::Store(format!("Failed to decode archive: {}", e));

    let archive_type: String = row.try_get("archive_type").map_err(decode)?;
    let access_level: String = row.try_get("access_level").map_err(decode)?;
    let file_path: String = row.try_get("file_path").map_err(decode)?;
    let size: i64 = row.try_get("file_size_bytes").map_err(decode)?;
    let retention_days: i32 = row.try_get("retention_days").map_err(decode)?;
    let key_id: Option<String> = row.try_get("encryption_key_id").map_err(decode)?;
    let metadata: serde_json::Value = row.try_get("metadata").map_err(decode)?;

    Ok(Archive {
        id: row.try_get("id").map_err(decode)?,
        name: row.try_get("archive_name").map_err(decode)?,
        archive_type: archive_type.parse()?,
        file_path: PathBuf::from(file_path),
        size_bytes: u64::try_from(size)
            .map_err(|_| ArchiveError::Store(format!("Negative archive size: {}", size)))?,
        encrypted: row.try_get("encrypted").map_err(decode)?,
        key_id: key_id.map(KeyId::new),
        source_actor: row.try_get("source_agent").map_err(decode)?,
        retention_days: u32::try_from(retention_days).map_err(|_| {
            ArchiveError::Store(format!("Negative retention: {}", retention_days))
        })?,
        access_level: access_level.parse()?,
        metadata: match metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        created_at: row.try_get("created_at").map_err(decode)?,
        expires_at: row.try_get("expires_at").map_err(decode)?,
    })
}

#[async_trait]
impl ArchiveStore for PostgresArchiveStore {
    async fn insert(&self, archive: &Archive) -> Result<()> {
        let size = i64::try_from(archive.size_bytes)
            .map_err(|_| ArchiveError::Store("Archive size exceeds BIGINT".to_string()))?;
        let retention_days = i32::try_from(archive.retention_days)
            .map_err(|_| ArchiveError::Store("Retention exceeds INTEGER".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO archives
                (id, archive_name, archive_type, file_path, file_size_bytes, encrypted,
                 encryption_key_id, source_agent, retention_days, access_level, metadata,
                 created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&archive.id)
        .bind(&archive.name)
        .bind(archive.archive_type.as_str())
        .bind(archive.file_path.to_string_lossy().as_ref())
        .bind(size)
        .bind(archive.encrypted)
        .bind(archive.key_id.as_ref().map(|k| k.as_str()))
        .bind(archive.source_actor.as_deref())
        .bind(retention_days)
        .bind(archive.access_level.as_str())
        .bind(serde_json::Value::Object(archive.metadata.clone()))
        .bind(archive.created_at)
        .bind(archive.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ArchiveError::Store(format!("Failed to insert archive: {}", e)))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Archive>> {
        let row = sqlx::query(&format!("SELECT {} FROM archives WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ArchiveError::Store(format!("Failed to get archive: {}", e)))?;

        row.as_ref().map(archive_from_row).transpose()
    }

    async fn list(&self, filter: &ArchiveFilter) -> Result<Vec<Archive>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM archives \
             WHERE ($1::TEXT IS NULL OR archive_type = $1) \
               AND ($2::TEXT IS NULL OR source_agent = $2) \
               AND ($3::TEXT IS NULL OR access_level = $3) \
             ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(filter.archive_type.map(|t| t.as_str()))
        .bind(filter.source_actor.as_deref())
        .bind(filter.access_level.map(|l| l.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ArchiveError::Store(format!("Failed to list archives: {}", e)))?;

        rows.iter().map(archive_from_row).collect()
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Archive>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM archives WHERE expires_at < $1 ORDER BY expires_at",
            SELECT_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ArchiveError::Store(format!("Failed to query expired archives: {}", e)))?;

        rows.iter().map(archive_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM archives WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ArchiveError::Store(format!("Failed to delete archive: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
