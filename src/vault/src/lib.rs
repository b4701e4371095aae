//! # Warden Vault
//!
//! Key custody for encrypted archives.
//!
//! ## Features
//!
//! - **Key generation**: 256-bit keys from the OS CSPRNG, zeroized on drop
//! - **Fingerprints**: non-secret SHA-256 lookup handles stored with archive metadata
//! - **Artifact sealing**: AES-256-GCM in the `iv ∥ tag ∥ ciphertext` layout
//! - **Envelope encryption**: data keys are wrapped under a master key before
//!   they reach a keystore
//! - **Keystores**: in-memory and sled-backed, separate from archive metadata
//!
//! ## Module Structure
//!
//! ```text
//! vault/
//! ├── keys/       - Key material and fingerprints
//! ├── cipher/     - Sealed artifact format
//! ├── storage/    - Keystore backends
//! └── custodian/  - KeyCustodian trait and envelope implementation
//! ```

pub mod cipher;
pub mod custodian;
pub mod error;
pub mod keys;
pub mod storage;

pub use cipher::{open, seal, IV_LEN, TAG_LEN};
pub use custodian::{EnvelopeKeyCustodian, KeyCustodian};
pub use error::{Result, VaultError};
pub use keys::{fingerprint, generate_key, ArchiveKey, KeyId, KEY_LEN};
pub use storage::{InMemoryKeyStore, KeyStore, SledKeyStore, StoredKey};
