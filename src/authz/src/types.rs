//! Core authorization types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use warden_core::ActorId;

/// Caller-supplied context for condition evaluation
pub type Context = HashMap<String, serde_json::Value>;

/// Privilege tier, ordered `Productive < Administrative < Executive`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Productive,
    Administrative,
    Executive,
}

impl Tier {
    /// All tiers, lowest first
    pub const ALL: [Tier; 3] = [Tier::Productive, Tier::Administrative, Tier::Executive];

    /// The tier immediately above this one
    pub fn next_above(self) -> Option<Tier> {
        match self {
            Tier::Productive => Some(Tier::Administrative),
            Tier::Administrative => Some(Tier::Executive),
            Tier::Executive => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Productive => "productive",
            Tier::Administrative => "administrative",
            Tier::Executive => "executive",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource types governed by the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    // Data
    Agents,
    Users,
    Conversations,
    Tasks,
    Archives,

    // Settings
    Settings,
    Integrations,

    // Governance
    Governance,
    Approvals,
    AuditLogs,

    // Analytics
    Analytics,
    Metrics,
    Reports,

    // IoT
    IotDevices,
    SensorData,

    // System
    SystemConfig,
    Deployments,
    Backups,
}

impl ResourceType {
    /// Every resource type, in declaration order
    pub const ALL: [ResourceType; 18] = [
        ResourceType::Agents,
        ResourceType::Users,
        ResourceType::Conversations,
        ResourceType::Tasks,
        ResourceType::Archives,
        ResourceType::Settings,
        ResourceType::Integrations,
        ResourceType::Governance,
        ResourceType::Approvals,
        ResourceType::AuditLogs,
        ResourceType::Analytics,
        ResourceType::Metrics,
        ResourceType::Reports,
        ResourceType::IotDevices,
        ResourceType::SensorData,
        ResourceType::SystemConfig,
        ResourceType::Deployments,
        ResourceType::Backups,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Agents => "agents",
            ResourceType::Users => "users",
            ResourceType::Conversations => "conversations",
            ResourceType::Tasks => "tasks",
            ResourceType::Archives => "archives",
            ResourceType::Settings => "settings",
            ResourceType::Integrations => "integrations",
            ResourceType::Governance => "governance",
            ResourceType::Approvals => "approvals",
            ResourceType::AuditLogs => "audit_logs",
            ResourceType::Analytics => "analytics",
            ResourceType::Metrics => "metrics",
            ResourceType::Reports => "reports",
            ResourceType::IotDevices => "iot_devices",
            ResourceType::SensorData => "sensor_data",
            ResourceType::SystemConfig => "system_config",
            ResourceType::Deployments => "deployments",
            ResourceType::Backups => "backups",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations an actor can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Execute,
    Approve,
    Share,
    Export,
}

impl Operation {
    /// Every operation, in declaration order
    pub const ALL: [Operation; 8] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Execute,
        Operation::Approve,
        Operation::Share,
        Operation::Export,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Execute => "execute",
            Operation::Approve => "approve",
            Operation::Share => "share",
            Operation::Export => "export",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor (agent or operator) requesting an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier (e.g., "sentinel", "devopsbot")
    pub id: ActorId,

    /// Privilege tier
    pub tier: Tier,

    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Actor {
    /// Create a new actor
    pub fn new(id: impl Into<ActorId>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            tier,
            name: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
