//! Rule-change audit trail
//!
//! Every accepted `add_rule` call is kept in memory and emitted as a
//! structured event on the `warden::audit` target.

use crate::policy::Rule;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use warden_core::ActorId;

/// Tracing target for governance audit events
pub const AUDIT_TARGET: &str = "warden::audit";

/// Audit log entry for an accepted rule change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleChange {
    /// Unique entry ID
    pub id: Uuid,

    /// Administrator who made the change
    pub admin: ActorId,

    /// Rule that was added
    pub rule: Rule,

    /// When the change was accepted
    pub at: DateTime<Utc>,
}

/// Append-only rule change log
#[derive(Debug, Default)]
pub struct RuleChangeLog {
    entries: RwLock<Vec<RuleChange>>,
}

impl RuleChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change and emit it
    pub fn record(&self, admin: &str, rule: &Rule) -> RuleChange {
        let entry = RuleChange {
            id: Uuid::new_v4(),
            admin: admin.to_string(),
            rule: rule.clone(),
            at: Utc::now(),
        };

        info!(
            target: AUDIT_TARGET,
            change_id = %entry.id,
            admin = %entry.admin,
            resource = %rule.resource,
            operation = %rule.operation,
            tiers = ?rule.tiers,
            "Custom rule added"
        );

        self.entries.write().push(entry.clone());
        entry
    }

    /// All recorded changes, oldest first
    pub fn entries(&self) -> Vec<RuleChange> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
