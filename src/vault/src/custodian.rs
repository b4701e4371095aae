//! Key custody
//!
//! Archive records carry only a [`KeyId`]. The key itself is issued, wrapped
//! and retrieved through a [`KeyCustodian`].

use crate::cipher;
use crate::error::{Result, VaultError};
use crate::keys::{fingerprint, generate_key, ArchiveKey, KeyId};
use crate::storage::{KeyStore, StoredKey};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Algorithm recorded with every issued key
pub const ARCHIVE_KEY_ALGORITHM: &str = "aes-256-gcm";

/// Issues, stores and retrieves archive keys
#[async_trait]
pub trait KeyCustodian: Send + Sync {
    /// Generate a fresh key, persist it, and return it with its fingerprint
    async fn issue_key(&self) -> Result<(KeyId, ArchiveKey)>;

    /// Retrieve a previously issued key
    async fn fetch_key(&self, key_id: &KeyId) -> Result<ArchiveKey>;

    /// Destroy a key; returns whether it existed
    async fn destroy_key(&self, key_id: &KeyId) -> Result<bool>;
}

/// Envelope-encryption custodian
///
/// Each data key is sealed under a master key before it reaches the
/// keystore, so the keystore never holds raw key material.
pub struct EnvelopeKeyCustodian {
    master_key: ArchiveKey,
    store: Arc<dyn KeyStore>,
}

impl EnvelopeKeyCustodian {
    /// Create a custodian over `store` using `master_key` as the key-encryption key
    pub fn new(master_key: ArchiveKey, store: Arc<dyn KeyStore>) -> Self {
        info!(
            "Key custodian initialized (master key {})",
            master_key.fingerprint()
        );
        Self { master_key, store }
    }

    /// Fingerprint of the master key (safe to log)
    pub fn master_key_id(&self) -> KeyId {
        self.master_key.fingerprint()
    }
}

#[async_trait]
impl KeyCustodian for EnvelopeKeyCustodian {
    async fn issue_key(&self) -> Result<(KeyId, ArchiveKey)> {
        let key = generate_key();
        let key_id = fingerprint(&key);
        let encrypted_key = cipher::seal(&self.master_key, key.as_bytes())?;

        self.store
            .put(StoredKey {
                key_id: key_id.clone(),
                encrypted_key,
                algorithm: ARCHIVE_KEY_ALGORITHM.to_string(),
                created_at: Utc::now(),
            })
            .await?;

        debug!("Issued archive key {}", key_id);
        Ok((key_id, key))
    }

    async fn fetch_key(&self, key_id: &KeyId) -> Result<ArchiveKey> {
        let record = self
            .store
            .get(key_id)
            .await?
            .ok_or_else(|| VaultError::KeyNotFound(key_id.to_string()))?;

        let raw = cipher::open(&self.master_key, &record.encrypted_key)?;
        let key = ArchiveKey::try_from_slice(&raw)?;

        if &fingerprint(&key) != key_id {
            return Err(VaultError::Key(format!(
                "Fingerprint mismatch for key {}",
                key_id
            )));
        }

        Ok(key)
    }

    async fn destroy_key(&self, key_id: &KeyId) -> Result<bool> {
        let existed = self.store.delete(key_id).await?;
        if existed {
            debug!("Destroyed archive key {}", key_id);
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKeyStore;

    fn custodian() -> (EnvelopeKeyCustodian, Arc<InMemoryKeyStore>) {
        let store = Arc::new(InMemoryKeyStore::new());
        (EnvelopeKeyCustodian::new(generate_key(), store.clone()), store)
    }

    #[tokio::test]
    async fn test_issue_and_fetch() {
        let (custodian, _) = custodian();

        let (key_id, key) = custodian.issue_key().await.unwrap();
        assert_eq!(key_id, fingerprint(&key));

        let fetched = custodian.fetch_key(&key_id).await.unwrap();
        assert_eq!(fetched.as_bytes(), key.as_bytes());
    }

    #[tokio::test]
    async fn test_keystore_never_holds_raw_key() {
        let (custodian, store) = custodian();
        let (key_id, key) = custodian.issue_key().await.unwrap();

        let record = store.get(&key_id).await.unwrap().unwrap();
        assert_eq!(record.algorithm, ARCHIVE_KEY_ALGORITHM);
        assert!(!record
            .encrypted_key
            .windows(key.as_bytes().len())
            .any(|w| w == key.as_bytes()));
    }

    #[tokio::test]
    async fn test_fetch_unknown_key() {
        let (custodian, _) = custodian();
        let result = custodian.fetch_key(&KeyId::new("0000000000000000")).await;
        assert!(matches!(result, Err(VaultError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn test_wrong_master_key_cannot_unwrap() {
        let store = Arc::new(InMemoryKeyStore::new());
        let issuer = EnvelopeKeyCustodian::new(generate_key(), store.clone());
        let intruder = EnvelopeKeyCustodian::new(generate_key(), store);

        let (key_id, _) = issuer.issue_key().await.unwrap();
        assert!(matches!(
            intruder.fetch_key(&key_id).await,
            Err(VaultError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn test_destroy_key() {
        let (custodian, store) = custodian();
        let (key_id, _) = custodian.issue_key().await.unwrap();

        assert!(custodian.destroy_key(&key_id).await.unwrap());
        assert!(!custodian.destroy_key(&key_id).await.unwrap());
        assert!(store.is_empty().await);
        assert!(custodian.fetch_key(&key_id).await.is_err());
    }
}
