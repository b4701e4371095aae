//! Archive metadata stores

use crate::error::{ArchiveError, Result};
use crate::types::{Archive, ArchiveFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_core::ArchiveId;

/// Archive metadata persistence
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Insert a new record; fails if the id already exists
    async fn insert(&self, archive: &Archive) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Archive>>;

    /// Records matching `filter`, newest first
    async fn list(&self, filter: &ArchiveFilter) -> Result<Vec<Archive>>;

    /// Records with `expires_at < now`
    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Archive>>;

    /// Delete a record; returns whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// In-memory archive store
pub struct InMemoryArchiveStore {
    archives: Arc<RwLock<HashMap<ArchiveId, Archive>>>,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self {
            archives: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.archives.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.archives.read().await.is_empty()
    }
}

impl Default for InMemoryArchiveStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchiveStore {
    async fn insert(&self, archive: &Archive) -> Result<()> {
        let mut archives = self.archives.write().await;
        if archives.contains_key(&archive.id) {
            return Err(ArchiveError::Store(format!(
                "Archive already exists: {}",
                archive.id
            )));
        }
        archives.insert(archive.id.clone(), archive.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Archive>> {
        Ok(self.archives.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &ArchiveFilter) -> Result<Vec<Archive>> {
        let archives = self.archives.read().await;
        let mut matching: Vec<Archive> = archives
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Archive>> {
        let archives = self.archives.read().await;
        let mut expired: Vec<Archive> = archives
            .values()
            .filter(|a| a.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(expired)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.archives.write().await.remove(id).is_some())
    }
}
