//! Built-in permission matrix

use crate::policy::Rule;
use crate::types::{Operation::*, ResourceType::*, Tier};

const E: Tier = Tier::Executive;
const A: Tier = Tier::Administrative;
const P: Tier = Tier::Productive;

/// Default rule table loaded at engine construction
///
/// Exactly one rule per `(resource, operation)` pair.
pub fn default_rules() -> Vec<Rule> {
    vec![
        // Agents
        Rule::new(Agents, Read, &[E, A, P]),
        Rule::new(Agents, Create, &[E]),
        Rule::new(Agents, Update, &[E, A]),
        Rule::new(Agents, Delete, &[E]),
        Rule::new(Agents, Execute, &[E, A, P]),
        // Users
        Rule::new(Users, Read, &[E, A]),
        Rule::new(Users, Create, &[E]),
        Rule::new(Users, Update, &[E]),
        Rule::new(Users, Delete, &[E]),
        // Conversations
        Rule::new(Conversations, Read, &[E, A, P]),
        Rule::new(Conversations, Create, &[E, A, P]),
        Rule::new(Conversations, Delete, &[E]),
        // Tasks
        Rule::new(Tasks, Read, &[E, A, P]),
        Rule::new(Tasks, Create, &[E, A]),
        Rule::new(Tasks, Update, &[E, A, P]),
        Rule::new(Tasks, Execute, &[P]),
        Rule::new(Tasks, Approve, &[E]),
        // Archives
        Rule::new(Archives, Read, &[E, A, P]),
        Rule::new(Archives, Create, &[E, A]),
        Rule::new(Archives, Delete, &[E]),
        Rule::new(Archives, Export, &[E]),
        // Settings
        Rule::new(Settings, Read, &[E, A]),
        Rule::new(Settings, Update, &[E]),
        // Integrations
        Rule::new(Integrations, Read, &[E, A, P]),
        Rule::new(Integrations, Create, &[E, A]),
        Rule::new(Integrations, Update, &[E, A]),
        Rule::new(Integrations, Delete, &[E]),
        Rule::new(Integrations, Execute, &[E, A, P]),
        // Governance
        Rule::new(Governance, Read, &[E, A]),
        Rule::new(Governance, Update, &[E]),
        Rule::new(Approvals, Create, &[E, A]),
        Rule::new(Approvals, Approve, &[E]),
        Rule::new(AuditLogs, Read, &[E, A]).with_actors(["sentinel", "guardian"]),
        // Analytics
        Rule::new(Analytics, Read, &[E, A, P]),
        Rule::new(Metrics, Read, &[E, A, P]),
        Rule::new(Reports, Create, &[E, A]),
        Rule::new(Reports, Export, &[E]),
        // IoT
        Rule::new(IotDevices, Read, &[E, A, P]),
        Rule::new(IotDevices, Create, &[E, A]),
        Rule::new(IotDevices, Update, &[E, A]),
        Rule::new(SensorData, Read, &[E, A, P]),
        Rule::new(SensorData, Create, &[P]),
        // System
        Rule::new(SystemConfig, Read, &[E]),
        Rule::new(SystemConfig, Update, &[E]),
        Rule::new(Deployments, Read, &[E, A]),
        Rule::new(Deployments, Execute, &[E]).with_actors(["devopsbot"]),
        Rule::new(Backups, Create, &[E, A]).with_actors(["phoenix"]),
        Rule::new(Backups, Read, &[E]),
    ]
}
