//! Retention sweeper
//!
//! Deletes archives past `expires_at`. Per record the order is file, key,
//! row: a crash mid-record can leave an orphaned row but never an untracked
//! artifact.

use crate::error::{ArchiveError, Result};
use crate::store::ArchiveStore;
use crate::types::Archive;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warden_authz::AccessGrantStore;
use warden_core::{SharedClock, SystemClock};
use warden_vault::KeyCustodian;

/// Sweeper configuration
#[derive(Debug, Clone, Default)]
pub struct SweeperConfig {
    /// Also purge expired access grants
    pub purge_grants: bool,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Archive rows deleted
    pub deleted: usize,

    /// Expired archives left in place after a failure
    pub failed: usize,

    /// Inert grants purged
    pub purged_grants: usize,
}

/// Removes expired archives and their keys
pub struct RetentionSweeper {
    store: Arc<dyn ArchiveStore>,
    custodian: Option<Arc<dyn KeyCustodian>>,
    grants: Option<Arc<AccessGrantStore>>,
    clock: SharedClock,
    config: SweeperConfig,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn ArchiveStore>, config: SweeperConfig) -> Self {
        Self {
            store,
            custodian: None,
            grants: None,
            clock: SystemClock::shared(),
            config,
        }
    }

    /// Custodian used to destroy keys of encrypted archives
    pub fn with_custodian(mut self, custodian: Arc<dyn KeyCustodian>) -> Self {
        self.custodian = Some(custodian);
        self
    }

    /// Grant store purged when `purge_grants` is set
    pub fn with_grants(mut self, grants: Arc<AccessGrantStore>) -> Self {
        self.grants = Some(grants);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Sweep expired archives; returns rows deleted, 0 on failure
    pub async fn cleanup_expired_archives(&self) -> usize {
        match self.try_cleanup().await {
            Ok(report) => report.deleted,
            Err(e) => {
                error!("Retention sweep failed: {}", e);
                0
            }
        }
    }

    /// Sweep expired archives
    ///
    /// Fails only if the expired set cannot be read. Per-record failures are
    /// counted in the report.
    pub async fn try_cleanup(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let expired = self.store.expired(now).await?;
        let mut report = SweepReport::default();

        debug!("Found {} expired archives", expired.len());

        for archive in &expired {
            match self.remove(archive).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(archive_id = %archive.id, "Failed to remove expired archive: {}", e);
                    report.failed += 1;
                }
            }
        }

        if self.config.purge_grants {
            if let Some(grants) = &self.grants {
                match grants.purge_expired().await {
                    Ok(purged) => report.purged_grants = purged,
                    Err(e) => warn!("Failed to purge expired grants: {}", e),
                }
            }
        }

        if report.deleted > 0 || report.failed > 0 {
            info!(
                deleted = report.deleted,
                failed = report.failed,
                purged_grants = report.purged_grants,
                "Retention sweep completed"
            );
        }
        Ok(report)
    }

    /// Remove one archive; `false` if another sweep already removed the row
    async fn remove(&self, archive: &Archive) -> Result<bool> {
        match tokio::fs::remove_file(&archive.file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %archive.file_path.display(), "Artifact already removed");
            }
            Err(e) => return Err(e.into()),
        }

        if archive.encrypted {
            if let Some(key_id) = &archive.key_id {
                let custodian = self.custodian.as_ref().ok_or_else(|| {
                    ArchiveError::KeyUnavailable(format!(
                        "Cannot destroy key {} without a key custodian",
                        key_id
                    ))
                })?;
                custodian.destroy_key(key_id).await?;
            }
        }

        let deleted = self.store.delete(&archive.id).await?;
        if deleted {
            debug!(archive_id = %archive.id, name = %archive.name, "Expired archive deleted");
        }
        Ok(deleted)
    }
}
