//! Archive configuration

use crate::types::AccessLevel;
use std::path::PathBuf;
use std::str::FromStr;
use warden_core::{CoreError, Result};

/// Default maximum bundle size (100 MiB)
pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 100 * 1024 * 1024;

/// Default gzip level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Default retention in days
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Archiver configuration
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Directory holding archive artifacts
    pub base_dir: PathBuf,

    /// Directory the scheduled job archives
    pub reports_dir: PathBuf,

    /// Directory for agent data snapshots
    pub agent_data_dir: PathBuf,

    /// Maximum bundle size in bytes
    pub max_archive_size: u64,

    /// gzip level (0-9)
    pub compression_level: u32,

    pub default_retention_days: u32,

    pub default_access_level: AccessLevel,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let base_dir = PathBuf::from("archives");
        Self {
            reports_dir: base_dir.join("reports"),
            agent_data_dir: base_dir.join("agent_data"),
            base_dir,
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            default_retention_days: DEFAULT_RETENTION_DAYS,
            default_access_level: AccessLevel::Internal,
        }
    }
}

impl ArchiveConfig {
    /// Config rooted at `base_dir`, other settings default
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            reports_dir: base_dir.join("reports"),
            agent_data_dir: base_dir.join("agent_data"),
            base_dir,
            ..Self::default()
        }
    }

    /// Load from `WARDEN_*` environment variables
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("WARDEN_ARCHIVE_DIR") {
            Ok(dir) => Self::with_base_dir(dir),
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("WARDEN_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }
        if let Some(size) = parse_env("WARDEN_MAX_ARCHIVE_BYTES")? {
            config.max_archive_size = size;
        }
        if let Some(level) = parse_env("WARDEN_COMPRESSION_LEVEL")? {
            config.compression_level = level;
        }
        if let Some(days) = parse_env("WARDEN_RETENTION_DAYS")? {
            config.default_retention_days = days;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(CoreError::configuration(format!(
                "Compression level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.max_archive_size == 0 {
            return Err(CoreError::configuration("Maximum archive size must be positive"));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::configuration(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
