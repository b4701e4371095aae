//! Scheduled maintenance job
//!
//! Archives the reports directory as encrypted internal logs, then sweeps.
//! The external scheduler (cron, systemd timer) invokes this once per run.

use crate::archiver::ResourceArchiver;
use crate::sweeper::{RetentionSweeper, SweepReport};
use crate::types::{AccessLevel, Archive, ArchiveOptions, ArchiveType};
use std::path::Path;
use tracing::{error, info};

/// Name of the scheduled reports archive
pub const SCHEDULED_ARCHIVE_NAME: &str = "system_logs";

/// Source actor recorded on scheduled archives
pub const SYSTEM_ACTOR: &str = "system";

/// Retention of scheduled archives
pub const SCHEDULED_RETENTION_DAYS: u32 = 90;

/// Outcome of one maintenance run
#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    /// Archive created from the reports directory, if any
    pub archive: Option<Archive>,
    pub sweep: SweepReport,
}

/// Archive `reports_dir`, then sweep expired archives
///
/// A failed archive step does not prevent the sweep.
pub async fn run_maintenance(
    archiver: &ResourceArchiver,
    sweeper: &RetentionSweeper,
    reports_dir: impl AsRef<Path>,
) -> MaintenanceReport {
    info!("Starting scheduled maintenance");

    let options = ArchiveOptions::new(ArchiveType::Logs)
        .encrypted()
        .with_access_level(AccessLevel::Internal)
        .with_source_actor(SYSTEM_ACTOR)
        .with_retention_days(SCHEDULED_RETENTION_DAYS);

    let archive = archiver
        .create_archive(reports_dir, SCHEDULED_ARCHIVE_NAME, options)
        .await;

    let sweep = match sweeper.try_cleanup().await {
        Ok(report) => report,
        Err(e) => {
            error!("Retention sweep failed: {}", e);
            SweepReport::default()
        }
    };

    info!(
        archived = archive.is_some(),
        deleted = sweep.deleted,
        "Scheduled maintenance completed"
    );
    MaintenanceReport { archive, sweep }
}
