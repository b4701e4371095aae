//! Sealed artifact format
//!
//! ```text
//! +----------+-----------+----------------+
//! | IV (16)  | Tag (16)  | Ciphertext ... |
//! +----------+-----------+----------------+
//! ```
//!
//! AES-256-GCM with a 16-byte nonce. The same layout wraps data keys under
//! the custodian's master key.

use crate::error::{Result, VaultError};
use crate::keys::ArchiveKey;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;

/// Nonce length in bytes
pub const IV_LEN: usize = 16;

/// GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

type ArtifactCipher = AesGcm<Aes256, U16>;

/// Encrypt `plaintext` into `iv ∥ tag ∥ ciphertext`
pub fn seal(key: &ArchiveKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ArtifactCipher::new(key.as_bytes().into());

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
        .map_err(|e| VaultError::Encryption(format!("AES-256-GCM encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(IV_LEN + TAG_LEN + buffer.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(tag.as_slice());
    sealed.extend_from_slice(&buffer);
    Ok(sealed)
}

/// Authenticate and decrypt an `iv ∥ tag ∥ ciphertext` blob
pub fn open(key: &ArchiveKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < IV_LEN + TAG_LEN {
        return Err(VaultError::Decryption(format!(
            "Sealed data too short: {} bytes",
            sealed.len()
        )));
    }

    let (iv, rest) = sealed.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let cipher = ArtifactCipher::new(key.as_bytes().into());
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(iv),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| VaultError::Decryption("Authentication tag mismatch".to_string()))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_key, ArchiveKey, KEY_LEN};
    use proptest::prelude::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = generate_key();
        let plaintext = b"compressed bundle bytes";

        let sealed = seal(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), IV_LEN + TAG_LEN + plaintext.len());
        assert_ne!(&sealed[IV_LEN + TAG_LEN..], plaintext);

        let opened = open(&key, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = generate_key();
        let sealed = seal(&key, b"").unwrap();
        assert_eq!(sealed.len(), IV_LEN + TAG_LEN);
        assert!(open(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let key = generate_key();
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = generate_key();
        let mut sealed = seal(&key, b"do not touch").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(matches!(open(&key, &sealed), Err(VaultError::Decryption(_))));
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let key = generate_key();
        let mut sealed = seal(&key, b"do not touch").unwrap();
        sealed[IV_LEN] ^= 0x80;

        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = seal(&generate_key(), b"secret").unwrap();
        assert!(open(&generate_key(), &sealed).is_err());
    }

    #[test]
    fn test_truncated_input_rejected() {
        let key = generate_key();
        assert!(matches!(
            open(&key, &[0u8; IV_LEN + TAG_LEN - 1]),
            Err(VaultError::Decryption(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_seal_open_roundtrip(
            key_bytes in any::<[u8; KEY_LEN]>(),
            plaintext in prop::collection::vec(any::<u8>(), 0..2048)
        ) {
            let key = ArchiveKey::from_bytes(key_bytes);
            let sealed = seal(&key, &plaintext).unwrap();

            prop_assert_eq!(sealed.len(), IV_LEN + TAG_LEN + plaintext.len());
            prop_assert_eq!(open(&key, &sealed).unwrap(), plaintext);
        }
    }
}
