//! Keystore backends
//!
//! A keystore only ever holds wrapped key material. It lives apart from the
//! archive metadata store so a leak of one does not expose the other.

use crate::error::{Result, VaultError};
use crate::keys::KeyId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Keystore tree name (mirrors the `encryption_keys` record type)
const KEYS_TREE: &str = "encryption_keys";

/// Keystore record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Fingerprint of the unwrapped key
    pub key_id: KeyId,

    /// Key wrapped under the custodian's master key
    pub encrypted_key: Vec<u8>,

    /// Algorithm the key is used with
    pub algorithm: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Keystore trait
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store a new record; fails if the key id already exists
    async fn put(&self, key: StoredKey) -> Result<()>;

    /// Fetch a record by key id
    async fn get(&self, key_id: &KeyId) -> Result<Option<StoredKey>>;

    /// Delete a record; returns whether it existed
    async fn delete(&self, key_id: &KeyId) -> Result<bool>;
}

/// In-memory keystore
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<KeyId, StoredKey>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn put(&self, key: StoredKey) -> Result<()> {
        let mut keys = self.keys.write().await;
        if keys.contains_key(&key.key_id) {
            return Err(VaultError::Storage(format!("Key already exists: {}", key.key_id)));
        }
        keys.insert(key.key_id.clone(), key);
        Ok(())
    }

    async fn get(&self, key_id: &KeyId) -> Result<Option<StoredKey>> {
        let keys = self.keys.read().await;
        Ok(keys.get(key_id).cloned())
    }

    async fn delete(&self, key_id: &KeyId) -> Result<bool> {
        let mut keys = self.keys.write().await;
        Ok(keys.remove(key_id).is_some())
    }
}

/// Sled-backed keystore
///
/// The database directory is created owner-only (0700) on Unix.
pub struct SledKeyStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledKeyStore {
    /// Open (or create) a keystore at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        restrict_permissions(path)?;

        let db = sled::open(path)
            .map_err(|e| VaultError::Storage(format!("Failed to open keystore: {}", e)))?;
        let tree = db
            .open_tree(KEYS_TREE)
            .map_err(|e| VaultError::Storage(format!("Failed to open keystore tree: {}", e)))?;

        debug!("Keystore opened at {}", path.display());
        Ok(Self { db, tree })
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| VaultError::Storage(format!("Failed to flush keystore: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyStore for SledKeyStore {
    async fn put(&self, key: StoredKey) -> Result<()> {
        let value = serde_json::to_vec(&key)
            .map_err(|e| VaultError::Storage(format!("Failed to serialize key record: {}", e)))?;

        self.tree
            .compare_and_swap(key.key_id.as_str(), None as Option<&[u8]>, Some(value))
            .map_err(|e| VaultError::Storage(format!("Failed to store key: {}", e)))?
            .map_err(|_| VaultError::Storage(format!("Key already exists: {}", key.key_id)))?;

        self.flush().await
    }

    async fn get(&self, key_id: &KeyId) -> Result<Option<StoredKey>> {
        let Some(raw) = self
            .tree
            .get(key_id.as_str())
            .map_err(|e| VaultError::Storage(format!("Failed to read key: {}", e)))?
        else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&raw)
            .map_err(|e| VaultError::Storage(format!("Corrupt key record {}: {}", key_id, e)))?;
        Ok(Some(record))
    }

    async fn delete(&self, key_id: &KeyId) -> Result<bool> {
        let removed = self
            .tree
            .remove(key_id.as_str())
            .map_err(|e| VaultError::Storage(format!("Failed to delete key: {}", e)))?
            .is_some();

        self.flush().await?;
        Ok(removed)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
