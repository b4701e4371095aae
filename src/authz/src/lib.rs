//! # Warden Authorization
//!
//! Tiered permission rules for governed agents, with per-resource access
//! grants as a supplementary override.
//!
//! ## Components
//!
//! - **PolicyEngine**: built-in rule table plus audited custom rules;
//!   tier checks, actor allow-lists, context conditions and escalation
//! - **AccessGrantStore**: time-boxed grants on single resource instances
//! - **Authorizer**: explicit policy-or-grant composition
//!
//! ## Example
//!
//! ```rust
//! use warden_authz::{Actor, EngineConfig, Operation, PolicyEngine, ResourceType, Tier};
//!
//! let engine = PolicyEngine::new(EngineConfig::default()).unwrap();
//! let sentinel = Actor::new("sentinel", Tier::Administrative);
//!
//! let decision = engine.check_permission(&sentinel, ResourceType::AuditLogs, Operation::Read, None);
//! assert!(decision.is_allowed());
//! ```

pub mod authorizer;
pub mod engine;
pub mod error;
pub mod grants;
pub mod matrix;
pub mod policy;
pub mod types;

pub use authorizer::{Authorization, Authorizer};
pub use engine::{
    Decision, DecisionStats, DenialReason, EngineConfig, PermissionReport, PolicyEngine,
    RuleChange,
};
pub use error::{AuthzError, Result};
pub use grants::{
    AccessGrant, AccessGrantStore, GrantKey, GrantResourceType, GrantStore, InMemoryGrantStore,
    Permission,
};
#[cfg(feature = "postgres")]
pub use grants::PostgresGrantStore;
pub use matrix::default_rules;
pub use policy::{Condition, ConditionOperator, Rule};
pub use types::{Actor, Context, Operation, ResourceType, Tier};
