//! Per-resource, time-boxed access grants
//!
//! Grants supplement the rule table for a single resource instance. They are
//! never mutated once stored and stop authorizing anything after `expires_at`,
//! whether or not a purge has run.

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresGrantStore;

use crate::error::{AuthzError, Result};
use crate::types::{Operation, ResourceType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use warden_core::{add_days, ActorId, SharedClock, SystemClock};

/// Grantable permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Share,
}

impl Permission {
    /// Grant permission that covers `operation`
    ///
    /// `execute` and `approve` are never grantable.
    pub fn for_operation(operation: Operation) -> Option<Self> {
        match operation {
            Operation::Read | Operation::Export => Some(Permission::Read),
            Operation::Create | Operation::Update => Some(Permission::Write),
            Operation::Delete => Some(Permission::Delete),
            Operation::Share => Some(Permission::Share),
            Operation::Execute | Operation::Approve => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Share => "share",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "delete" => Ok(Permission::Delete),
            "share" => Ok(Permission::Share),
            other => Err(AuthzError::InvalidGrant(format!("Unknown permission: {}", other))),
        }
    }
}

/// Resource types that accept grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantResourceType {
    Archive,
    AgentData,
    SystemLogs,
}

impl GrantResourceType {
    /// Grant resource type consulted for a rule-table resource
    pub fn for_resource(resource: ResourceType) -> Option<Self> {
        match resource {
            ResourceType::Archives => Some(GrantResourceType::Archive),
            ResourceType::Agents => Some(GrantResourceType::AgentData),
            ResourceType::AuditLogs => Some(GrantResourceType::SystemLogs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrantResourceType::Archive => "archive",
            GrantResourceType::AgentData => "agent_data",
            GrantResourceType::SystemLogs => "system_logs",
        }
    }
}

impl fmt::Display for GrantResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantResourceType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "archive" => Ok(GrantResourceType::Archive),
            "agent_data" => Ok(GrantResourceType::AgentData),
            "system_logs" => Ok(GrantResourceType::SystemLogs),
            other => Err(AuthzError::InvalidGrant(format!(
                "Unknown grant resource type: {}",
                other
            ))),
        }
    }
}

/// Unique key of a grant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantKey {
    pub actor_id: ActorId,
    pub resource_type: GrantResourceType,
    pub resource_id: String,
}

impl GrantKey {
    pub fn new(
        actor_id: impl Into<ActorId>,
        resource_type: GrantResourceType,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            resource_type,
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.actor_id, self.resource_type, self.resource_id)
    }
}

/// Stored access grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Grantee
    pub actor_id: ActorId,

    pub resource_type: GrantResourceType,

    pub resource_id: String,

    /// Granted permissions (never empty)
    pub permissions: BTreeSet<Permission>,

    /// Actor who issued the grant
    pub granted_by: ActorId,

    pub granted_at: DateTime<Utc>,

    /// Expiry; `None` never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessGrant {
    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.actor_id.clone(), self.resource_type, self.resource_id.clone())
    }

    /// Whether the grant still authorizes anything at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| now <= expires_at)
    }

    /// Whether the grant authorizes `permission` at `now`
    pub fn allows(&self, permission: Permission, now: DateTime<Utc>) -> bool {
        self.is_active(now) && self.permissions.contains(&permission)
    }
}

/// Grant persistence
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert a grant
    ///
    /// Replaces an existing grant for the same key only when that grant is
    /// inert at `now`; otherwise fails with [`AuthzError::GrantConflict`].
    async fn insert(&self, grant: AccessGrant, now: DateTime<Utc>) -> Result<()>;

    /// Look up the grant for `key`, active or not
    async fn find(&self, key: &GrantKey) -> Result<Option<AccessGrant>>;

    /// Remove grants inert at `now`; returns how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// In-memory grant store
pub struct InMemoryGrantStore {
    grants: Arc<RwLock<HashMap<GrantKey, AccessGrant>>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self {
            grants: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored grants, including inert ones
    pub async fn len(&self) -> usize {
        self.grants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.grants.read().await.is_empty()
    }
}

impl Default for InMemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn insert(&self, grant: AccessGrant, now: DateTime<Utc>) -> Result<()> {
        let key = grant.key();
        let mut grants = self.grants.write().await;

        if let Some(existing) = grants.get(&key) {
            if existing.is_active(now) {
                return Err(AuthzError::GrantConflict(format!(
                    "Active grant already exists for {}",
                    key
                )));
            }
        }

        grants.insert(key, grant);
        Ok(())
    }

    async fn find(&self, key: &GrantKey) -> Result<Option<AccessGrant>> {
        Ok(self.grants.read().await.get(key).cloned())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut grants = self.grants.write().await;
        let before = grants.len();
        grants.retain(|_, grant| grant.is_active(now));
        Ok(before - grants.len())
    }
}

/// Grant issuing and checking over a [`GrantStore`]
pub struct AccessGrantStore {
    store: Arc<dyn GrantStore>,
    clock: SharedClock,
}

impl AccessGrantStore {
    pub fn new(store: Arc<dyn GrantStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// In-memory store on the system clock
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryGrantStore::new()), SystemClock::shared())
    }

    /// Store a grant, reporting failures as errors
    pub async fn try_grant_access(
        &self,
        actor_id: &str,
        resource_type: GrantResourceType,
        resource_id: &str,
        permissions: impl IntoIterator<Item = Permission>,
        granted_by: &str,
        expires_in_days: Option<u32>,
    ) -> Result<AccessGrant> {
        let permissions: BTreeSet<Permission> = permissions.into_iter().collect();
        if permissions.is_empty() {
            return Err(AuthzError::InvalidGrant(
                "A grant needs at least one permission".to_string(),
            ));
        }
        if actor_id.is_empty() || resource_id.is_empty() {
            return Err(AuthzError::InvalidGrant(
                "Grant actor and resource id must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let grant = AccessGrant {
            actor_id: actor_id.to_string(),
            resource_type,
            resource_id: resource_id.to_string(),
            permissions,
            granted_by: granted_by.to_string(),
            granted_at: now,
            expires_at: expires_in_days.map(|days| add_days(now, days)),
        };

        self.store.insert(grant.clone(), now).await?;

        info!(
            actor = %grant.actor_id,
            resource_type = %grant.resource_type,
            resource_id = %grant.resource_id,
            granted_by = %grant.granted_by,
            expires_at = ?grant.expires_at,
            "Access granted"
        );
        Ok(grant)
    }

    /// Store a grant; returns false on any failure
    pub async fn grant_access(
        &self,
        actor_id: &str,
        resource_type: GrantResourceType,
        resource_id: &str,
        permissions: impl IntoIterator<Item = Permission>,
        granted_by: &str,
        expires_in_days: Option<u32>,
    ) -> bool {
        match self
            .try_grant_access(
                actor_id,
                resource_type,
                resource_id,
                permissions,
                granted_by,
                expires_in_days,
            )
            .await
        {
            Ok(_) => true,
            Err(AuthzError::GrantConflict(msg)) => {
                warn!("Grant rejected: {}", msg);
                false
            }
            Err(e) => {
                error!(
                    actor = actor_id,
                    %resource_type,
                    resource_id,
                    "Failed to grant access: {}",
                    e
                );
                false
            }
        }
    }

    /// Check a grant, reporting store failures as errors
    pub async fn try_check_access(
        &self,
        actor_id: &str,
        resource_type: GrantResourceType,
        resource_id: &str,
        required: Permission,
    ) -> Result<bool> {
        let key = GrantKey::new(actor_id, resource_type, resource_id);
        let Some(grant) = self.store.find(&key).await? else {
            return Ok(false);
        };

        let allowed = grant.allows(required, self.clock.now());
        debug!(grant = %key, permission = %required, allowed, "Grant check");
        Ok(allowed)
    }

    /// Check a grant; store failures deny
    pub async fn check_access(
        &self,
        actor_id: &str,
        resource_type: GrantResourceType,
        resource_id: &str,
        required: Permission,
    ) -> bool {
        match self
            .try_check_access(actor_id, resource_type, resource_id, required)
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                error!(
                    actor = actor_id,
                    %resource_type,
                    resource_id,
                    "Grant check failed, denying: {}",
                    e
                );
                false
            }
        }
    }

    /// Physically remove inert grants
    pub async fn purge_expired(&self) -> Result<usize> {
        let purged = self.store.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            info!("Purged {} expired grants", purged);
        }
        Ok(purged)
    }
}
