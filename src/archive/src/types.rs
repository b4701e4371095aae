//! Archive record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use warden_core::{ActorId, ArchiveId};
use warden_vault::KeyId;

use crate::error::ArchiveError;

/// Kind of data an archive holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveType {
    Logs,
    Reports,
    AgentData,
    SystemBackup,
    FullSnapshot,
}

impl ArchiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveType::Logs => "logs",
            ArchiveType::Reports => "reports",
            ArchiveType::AgentData => "agent_data",
            ArchiveType::SystemBackup => "system_backup",
            ArchiveType::FullSnapshot => "full_snapshot",
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveType {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logs" => Ok(ArchiveType::Logs),
            "reports" => Ok(ArchiveType::Reports),
            "agent_data" => Ok(ArchiveType::AgentData),
            "system_backup" => Ok(ArchiveType::SystemBackup),
            "full_snapshot" => Ok(ArchiveType::FullSnapshot),
            other => Err(ArchiveError::Store(format!("Unknown archive type: {}", other))),
        }
    }
}

/// Sensitivity, ordered `Public < Internal < Confidential < Restricted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Internal,
    Confidential,
    Restricted,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Internal => "internal",
            AccessLevel::Confidential => "confidential",
            AccessLevel::Restricted => "restricted",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(AccessLevel::Public),
            "internal" => Ok(AccessLevel::Internal),
            "confidential" => Ok(AccessLevel::Confidential),
            "restricted" => Ok(AccessLevel::Restricted),
            other => Err(ArchiveError::Store(format!("Unknown access level: {}", other))),
        }
    }
}

/// Persisted archive record
///
/// Immutable once stored. For encrypted archives `key_id` is the custodian
/// lookup handle; the key itself is never part of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub id: ArchiveId,

    pub name: String,

    #[serde(rename = "type")]
    pub archive_type: ArchiveType,

    /// Final artifact location
    pub file_path: PathBuf,

    /// Size of the final on-disk artifact
    pub size_bytes: u64,

    pub encrypted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<KeyId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_actor: Option<ActorId>,

    pub retention_days: u32,

    pub access_level: AccessLevel,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,

    /// `created_at + retention_days·86400s`
    pub expires_at: DateTime<Utc>,
}

impl Archive {
    /// Whether the sweeper may delete this archive at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Options for creating an archive
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub archive_type: ArchiveType,

    /// Seal the bundle with a fresh custodian key
    pub encrypt: bool,

    /// Falls back to the configured default
    pub access_level: Option<AccessLevel>,

    pub source_actor: Option<ActorId>,

    /// Falls back to the configured default
    pub retention_days: Option<u32>,

    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ArchiveOptions {
    pub fn new(archive_type: ArchiveType) -> Self {
        Self {
            archive_type,
            encrypt: false,
            access_level: None,
            source_actor: None,
            retention_days: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = Some(level);
        self
    }

    pub fn with_source_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.source_actor = Some(actor.into());
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Filter for listing archives; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct ArchiveFilter {
    pub archive_type: Option<ArchiveType>,
    pub source_actor: Option<ActorId>,
    pub access_level: Option<AccessLevel>,
}

impl ArchiveFilter {
    pub fn matches(&self, archive: &Archive) -> bool {
        self.archive_type.map_or(true, |t| archive.archive_type == t)
            && self
                .source_actor
                .as_ref()
                .map_or(true, |actor| archive.source_actor.as_ref() == Some(actor))
            && self.access_level.map_or(true, |level| archive.access_level == level)
    }
}
