//! Resource archiver
//!
//! Builds a gzip tar of a directory, optionally seals it under a fresh
//! custodian key, moves it into place durably, and only then records it.

use crate::bundle;
use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, Result};
use crate::store::ArchiveStore;
use crate::types::{Archive, ArchiveFilter, ArchiveOptions};
use chrono::{DateTime, Utc};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_core::{add_days, SharedClock, SystemClock};
use warden_vault::{cipher, ArchiveKey, KeyCustodian, KeyId};

const BUNDLE_EXTENSION: &str = "tar.gz";
const SEALED_SUFFIX: &str = ".enc";

/// Creates, lists and restores archives
pub struct ResourceArchiver {
    config: ArchiveConfig,
    store: Arc<dyn ArchiveStore>,
    custodian: Option<Arc<dyn KeyCustodian>>,
    clock: SharedClock,
}

impl ResourceArchiver {
    /// Archiver without encryption support on the system clock
    pub fn new(config: ArchiveConfig, store: Arc<dyn ArchiveStore>) -> Self {
        Self {
            config,
            store,
            custodian: None,
            clock: SystemClock::shared(),
        }
    }

    /// Enable encrypted archives
    pub fn with_custodian(mut self, custodian: Arc<dyn KeyCustodian>) -> Self {
        self.custodian = Some(custodian);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Create the base, reports and agent-data directories
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config.base_dir,
            &self.config.reports_dir,
            &self.config.agent_data_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Archive `source_dir`; failures are logged and yield `None`
    pub async fn create_archive(
        &self,
        source_dir: impl AsRef<Path>,
        name: &str,
        options: ArchiveOptions,
    ) -> Option<Archive> {
        let source_dir = source_dir.as_ref();
        match self.try_create_archive(source_dir, name, options).await {
            Ok(archive) => Some(archive),
            Err(e) => {
                error!(
                    source = %source_dir.display(),
                    name,
                    "Archive creation failed: {}",
                    e
                );
                None
            }
        }
    }

    /// Archive `source_dir`, reporting the failure kind
    pub async fn try_create_archive(
        &self,
        source_dir: impl AsRef<Path>,
        name: &str,
        options: ArchiveOptions,
    ) -> Result<Archive> {
        let source_dir = source_dir.as_ref().to_path_buf();
        validate_name(name)?;

        tokio::fs::create_dir_all(&self.config.base_dir).await?;

        let is_dir = tokio::fs::metadata(&source_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ArchiveError::NotFound(format!(
                "Source directory {}",
                source_dir.display()
            )));
        }

        let custodian = match (options.encrypt, &self.custodian) {
            (false, _) => None,
            (true, Some(custodian)) => Some(Arc::clone(custodian)),
            (true, None) => {
                return Err(ArchiveError::KeyUnavailable(
                    "Encryption requested but no key custodian is configured".to_string(),
                ))
            }
        };

        let bundle = self.build_bundle(source_dir.clone()).await?;

        let Some(custodian) = custodian else {
            return self.persist_and_record(bundle, name, &options, None).await;
        };

        let (key_id, key) = custodian.issue_key().await?;
        let result = async {
            let sealed = self.seal_bundle(bundle, key).await?;
            self.persist_and_record(sealed, name, &options, Some(key_id.clone()))
                .await
        }
        .await;

        if result.is_err() {
            // The key protects nothing once the artifact is gone
            if let Err(e) = custodian.destroy_key(&key_id).await {
                warn!(key_id = %key_id, "Failed to destroy key of abandoned archive: {}", e);
            }
        }
        result
    }

    /// Bundle `source_dir` into a temporary file in the base directory
    async fn build_bundle(&self, source_dir: PathBuf) -> Result<NamedTempFile> {
        let base_dir = self.config.base_dir.clone();
        let level = self.config.compression_level;
        let limit = self.config.max_archive_size;

        tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let exclude = nested_base_dir(&source_dir, &base_dir)?;
            let source_size = bundle::directory_size(&source_dir, exclude.as_deref())?;
            debug!(source = %source_dir.display(), source_size, "Bundling directory");

            let temp = temp_file_in(&base_dir)?;
            let writer = BufWriter::new(temp.reopen()?);
            let mut writer =
                bundle::write_bundle(&source_dir, exclude.as_deref(), writer, level)?;
            writer.flush()?;

            let size = temp.as_file().metadata()?.len();
            if size > limit {
                return Err(ArchiveError::TooLarge { size, limit });
            }
            Ok(temp)
        })
        .await?
    }

    /// Seal a plaintext bundle into a second temporary file
    ///
    /// The plaintext temporary is removed when this returns, on every path.
    async fn seal_bundle(&self, plaintext: NamedTempFile, key: ArchiveKey) -> Result<NamedTempFile> {
        let base_dir = self.config.base_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let bytes = std::fs::read(plaintext.path())?;
            drop(plaintext);

            let sealed = cipher::seal(&key, &bytes)?;
            let mut temp = temp_file_in(&base_dir)?;
            temp.write_all(&sealed)?;
            Ok(temp)
        })
        .await?
    }

    /// Move the artifact into place, then insert its row
    async fn persist_and_record(
        &self,
        artifact: NamedTempFile,
        name: &str,
        options: &ArchiveOptions,
        key_id: Option<KeyId>,
    ) -> Result<Archive> {
        let stamp = self.clock.now();
        let encrypted = key_id.is_some();
        let file_name = artifact_file_name(name, stamp, encrypted);
        let final_path = self.config.base_dir.join(file_name);

        let persisted_path = final_path.clone();
        // Nothing fallible runs between the rename and the guard
        let size_bytes = tokio::task::spawn_blocking(move || -> Result<u64> {
            artifact.as_file().sync_all()?;
            let size = artifact.as_file().metadata()?.len();
            artifact
                .persist_noclobber(&persisted_path)
                .map_err(|e| ArchiveError::Io(e.error))?;
            Ok(size)
        })
        .await??;

        let guard = ArtifactGuard::new(final_path.clone());

        let retention_days = options
            .retention_days
            .unwrap_or(self.config.default_retention_days);
        let created_at = self.clock.now();
        let archive = Archive {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            archive_type: options.archive_type,
            file_path: final_path,
            size_bytes,
            encrypted,
            key_id,
            source_actor: options.source_actor.clone(),
            retention_days,
            access_level: options
                .access_level
                .unwrap_or(self.config.default_access_level),
            metadata: options.metadata.clone(),
            created_at,
            expires_at: add_days(created_at, retention_days),
        };

        self.store.insert(&archive).await?;
        guard.disarm();

        info!(
            archive_id = %archive.id,
            name = %archive.name,
            archive_type = %archive.archive_type,
            size_bytes = archive.size_bytes,
            encrypted = archive.encrypted,
            expires_at = %archive.expires_at,
            "Archive created"
        );
        Ok(archive)
    }

    /// Unpack an archive's artifact into `dest`
    pub async fn restore_archive(&self, archive: &Archive, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref().to_path_buf();

        let bytes = match tokio::fs::read(&archive.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::NotFound(format!(
                    "Artifact {}",
                    archive.file_path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let bundle = if archive.encrypted {
            let key_id = archive.key_id.as_ref().ok_or_else(|| {
                ArchiveError::Store(format!("Encrypted archive {} has no key id", archive.id))
            })?;
            let custodian = self.custodian.as_ref().ok_or_else(|| {
                ArchiveError::KeyUnavailable(format!(
                    "Archive {} is encrypted but no key custodian is configured",
                    archive.id
                ))
            })?;
            let key = custodian.fetch_key(key_id).await?;
            cipher::open(&key, &bytes)?
        } else {
            bytes
        };

        let target = dest.clone();
        tokio::task::spawn_blocking(move || bundle::unpack_bundle(&bundle[..], &target)).await??;

        info!(archive_id = %archive.id, dest = %dest.display(), "Archive restored");
        Ok(())
    }

    /// Archives matching `filter`, newest first
    pub async fn list_archives(&self, filter: &ArchiveFilter) -> Result<Vec<Archive>> {
        self.store.list(filter).await
    }

    pub async fn get_archive(&self, id: &str) -> Result<Option<Archive>> {
        self.store.get(id).await
    }
}

/// Removes a persisted artifact unless disarmed
struct ArtifactGuard {
    path: Option<PathBuf>,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), "Failed to remove unrecorded artifact: {}", e);
            }
        }
    }
}

/// `base_dir` relative to `source_dir` when it lies inside the tree being archived
fn nested_base_dir(source_dir: &Path, base_dir: &Path) -> Result<Option<PathBuf>> {
    let source = std::fs::canonicalize(source_dir)?;
    let base = std::fs::canonicalize(base_dir)?;

    match base.strip_prefix(&source) {
        Ok(relative) if relative.as_os_str().is_empty() => Err(ArchiveError::Configuration(
            format!("Archive directory {} is the source directory", base.display()),
        )),
        Ok(relative) => Ok(Some(relative.to_path_buf())),
        Err(_) => Ok(None),
    }
}

fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(".warden-")
        .suffix(".partial")
        .tempfile_in(dir)?)
}

/// `<name>_<timestamp>.tar.gz[.enc]`
fn artifact_file_name(name: &str, stamp: DateTime<Utc>, encrypted: bool) -> String {
    format!(
        "{}_{}.{}{}",
        name,
        stamp.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        BUNDLE_EXTENSION,
        if encrypted { SEALED_SUFFIX } else { "" }
    )
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidName(name.to_string()))
    }
}
