//! PostgreSQL grant store

use super::{AccessGrant, GrantKey, GrantStore, Permission};
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

/// PostgreSQL grant store backed by the `access_control` table
pub struct PostgresGrantStore {
    pool: PgPool,
}

impl PostgresGrantStore {
    /// Connect with a pooled connection
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AuthzError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(Self { pool })
    }

    /// Use an existing pool
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
            .map_err(|e| AuthzError::Database(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn grant_from_row(row: &PgRow) -> Result<AccessGrant> {
    let decode = |e: sqlx::Error| AuthzError::Database(format!("Failed to decode grant: {}", e));

    let resource_type: String = row.try_get("resource_type").map_err(decode)?;
    let permissions: Vec<String> = row.try_get("permissions").map_err(decode)?;

    Ok(AccessGrant {
        actor_id: row.try_get("agent_id").map_err(decode)?,
        resource_type: resource_type.parse()?,
        resource_id: row.try_get("resource_id").map_err(decode)?,
        permissions: permissions
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<Result<_>>()?,
        granted_by: row.try_get("granted_by").map_err(decode)?,
        granted_at: row.try_get("granted_at").map_err(decode)?,
        expires_at: row.try_get("expires_at").map_err(decode)?,
    })
}

#[async_trait]
impl GrantStore for PostgresGrantStore {
    async fn insert(&self, grant: AccessGrant, now: DateTime<Utc>) -> Result<()> {
        let permissions: Vec<String> = grant
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        // An existing row is only overwritten once it has expired
        let result = sqlx::query(
            r#"
            INSERT INTO access_control
                (agent_id, resource_type, resource_id, permissions, granted_by, granted_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (agent_id, resource_type, resource_id)
            DO UPDATE SET
                permissions = EXCLUDED.permissions,
                granted_by = EXCLUDED.granted_by,
                granted_at = EXCLUDED.granted_at,
                expires_at = EXCLUDED.expires_at
            WHERE access_control.expires_at IS NOT NULL
              AND access_control.expires_at < $8
            "#,
        )
        .bind(&grant.actor_id)
        .bind(grant.resource_type.as_str())
        .bind(&grant.resource_id)
        .bind(&permissions)
        .bind(&grant.granted_by)
        .bind(grant.granted_at)
        .bind(grant.expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthzError::Database(format!("Failed to insert grant: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AuthzError::GrantConflict(format!(
                "Active grant already exists for {}",
                grant.key()
            )));
        }

        Ok(())
    }

    async fn find(&self, key: &GrantKey) -> Result<Option<AccessGrant>> {
        let row = sqlx::query(
            r#"
            SELECT agent_id, resource_type, resource_id, permissions, granted_by, granted_at, expires_at
            FROM access_control
            WHERE agent_id = $1 AND resource_type = $2 AND resource_id = $3
            "#,
        )
        .bind(&key.actor_id)
        .bind(key.resource_type.as_str())
        .bind(&key.resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthzError::Database(format!("Failed to get grant: {}", e)))?;

        row.as_ref().map(grant_from_row).transpose()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query(
            "DELETE FROM access_control WHERE expires_at IS NOT NULL AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthzError::Database(format!("Failed to purge grants: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }
}
