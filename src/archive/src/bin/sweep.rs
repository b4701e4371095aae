//! # warden-sweep
//!
//! One-shot maintenance run for an external scheduler (cron, systemd timer).
//! Archives the reports directory, then sweeps expired archives.
//!
//! ## Usage
//!
//! ```text
//! warden-sweep               # archive reports, then sweep
//! warden-sweep --sweep-only  # sweep only
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` - PostgreSQL connection string (required)
//! - `WARDEN_KEYSTORE_PATH` - sled keystore directory (default: ./keystore)
//! - `WARDEN_MASTER_KEY` - 64 hex chars, key-encryption key (required)
//! - `WARDEN_PURGE_GRANTS` - also purge expired access grants (default: false)
//! - `WARDEN_ARCHIVE_DIR`, `WARDEN_REPORTS_DIR`, `WARDEN_MAX_ARCHIVE_BYTES`,
//!   `WARDEN_COMPRESSION_LEVEL`, `WARDEN_RETENTION_DAYS` - archive settings
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_archive::{
    run_maintenance, ArchiveConfig, PostgresArchiveStore, ResourceArchiver, RetentionSweeper,
    SweeperConfig,
};
use warden_authz::{AccessGrantStore, PostgresGrantStore};
use warden_core::{CoreError, SystemClock};
use warden_vault::{ArchiveKey, EnvelopeKeyCustodian, KeyCustodian, SledKeyStore};

fn required_env(name: &str) -> Result<String, CoreError> {
    std::env::var(name).map_err(|_| CoreError::configuration(format!("{} not set", name)))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let sweep_only = std::env::args().skip(1).any(|arg| arg == "--sweep-only");

    let config = ArchiveConfig::from_env()?;
    let database_url = required_env("DATABASE_URL")?;
    let master_key = ArchiveKey::from_hex(&required_env("WARDEN_MASTER_KEY")?)
        .context("WARDEN_MASTER_KEY must be 64 hex characters")?;
    let keystore_path =
        std::env::var("WARDEN_KEYSTORE_PATH").unwrap_or_else(|_| "./keystore".to_string());
    let purge_grants = env_flag("WARDEN_PURGE_GRANTS");

    let store = Arc::new(PostgresArchiveStore::new(&database_url).await?);
    store.run_migrations().await?;

    let keystore = Arc::new(SledKeyStore::open(&keystore_path)?);
    let custodian: Arc<dyn KeyCustodian> =
        Arc::new(EnvelopeKeyCustodian::new(master_key, keystore));

    let mut sweeper = RetentionSweeper::new(store.clone(), SweeperConfig { purge_grants })
        .with_custodian(custodian.clone());

    if purge_grants {
        let grant_store = PostgresGrantStore::from_pool(store.pool().clone());
        grant_store.run_migrations().await?;
        let grants = AccessGrantStore::new(Arc::new(grant_store), SystemClock::shared());
        sweeper = sweeper.with_grants(Arc::new(grants));
    }

    if sweep_only {
        let report = sweeper.try_cleanup().await?;
        info!(
            deleted = report.deleted,
            failed = report.failed,
            purged_grants = report.purged_grants,
            "Sweep finished"
        );
        return Ok(());
    }

    let archiver = ResourceArchiver::new(config.clone(), store).with_custodian(custodian);
    archiver.ensure_directories().await?;

    let report = run_maintenance(&archiver, &sweeper, &config.reports_dir).await;
    info!(
        archive = report.archive.as_ref().map(|a| a.id.as_str()).unwrap_or("none"),
        deleted = report.sweep.deleted,
        failed = report.sweep.failed,
        "Maintenance finished"
    );
    Ok(())
}
