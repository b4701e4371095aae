//! Archive key material and fingerprints

use crate::error::{Result, VaultError};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::ZeroizeOnDrop;

/// Archive key size (256 bits)
pub const KEY_LEN: usize = 32;

/// Hex characters kept from the SHA-256 digest
const FINGERPRINT_LEN: usize = 16;

/// Symmetric archive key, zeroized on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct ArchiveKey {
    bytes: [u8; KEY_LEN],
}

impl ArchiveKey {
    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Create a key from a slice, which must be exactly [`KEY_LEN`] bytes
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != KEY_LEN {
            return Err(VaultError::Key(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LEN,
                slice.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    /// Parse a key from 64 hex characters (e.g. a master key from the environment)
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let raw = hex::decode(encoded.trim())
            .map_err(|e| VaultError::Key(format!("Invalid hex key: {}", e)))?;
        Self::try_from_slice(&raw)
    }

    /// Key material (sensitive)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Fingerprint of this key
    pub fn fingerprint(&self) -> KeyId {
        fingerprint(self)
    }
}

impl fmt::Debug for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveKey").finish_non_exhaustive()
    }
}

/// Non-secret key handle: first 16 lowercase hex chars of SHA-256(key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Wrap an existing key id (e.g. read back from archive metadata)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for KeyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Generate a fresh 256-bit key from the OS CSPRNG
pub fn generate_key() -> ArchiveKey {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    ArchiveKey { bytes }
}

/// Fingerprint a key
pub fn fingerprint(key: &ArchiveKey) -> KeyId {
    let digest = Sha256::digest(key.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    KeyId(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_is_random() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn test_fingerprint_format() {
        let key = generate_key();
        let id = fingerprint(&key);

        assert_eq!(id.as_str().len(), 16);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_fingerprint_known_vector() {
        // SHA-256 of 32 zero bytes starts with 66687aadf862bd77
        let key = ArchiveKey::from_bytes([0u8; KEY_LEN]);
        assert_eq!(fingerprint(&key).as_str(), "66687aadf862bd77");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let key = generate_key();
        assert_eq!(fingerprint(&key), key.fingerprint());
        assert_eq!(fingerprint(&key), fingerprint(&key.clone()));
    }

    #[test]
    fn test_try_from_slice_rejects_wrong_length() {
        assert!(ArchiveKey::try_from_slice(&[1u8; 16]).is_err());
        assert!(ArchiveKey::try_from_slice(&[1u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn test_from_hex() {
        let encoded = "11".repeat(KEY_LEN);
        let key = ArchiveKey::from_hex(&encoded).unwrap();
        assert_eq!(key.as_bytes(), &[0x11u8; KEY_LEN]);

        assert!(ArchiveKey::from_hex("not-hex").is_err());
        assert!(ArchiveKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_hides_material() {
        let key = ArchiveKey::from_bytes([0xAB; KEY_LEN]);
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("171"));
        assert!(!rendered.to_lowercase().contains("ab, ab"));
    }
}
