//! Tiered policy engine
//!
//! Evaluates `(actor, resource, operation, context)` against a built-in rule
//! table plus an optional list of custom rules added at boot.

pub mod audit;
pub mod decision;
pub mod metrics;
pub mod report;

pub use audit::{RuleChange, RuleChangeLog, AUDIT_TARGET};
pub use decision::{Decision, DenialReason};
pub use metrics::{DecisionCounters, DecisionStats};
pub use report::{PermissionReport, ResourceSummary, TierSummary};

use crate::error::{AuthzError, Result};
use crate::matrix::default_rules;
use crate::policy::Rule;
use crate::types::{Actor, Context, Operation, ResourceType};

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use warden_core::ActorId;

/// Policy engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Approvers attached to escalated decisions
    pub escalation_approvers: Vec<ActorId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalation_approvers: vec![
                "mrf".to_string(),
                "genius".to_string(),
                "oracle".to_string(),
            ],
        }
    }
}

/// Tiered policy engine
///
/// # Evaluation
///
/// ```text
/// rule lookup → tier check (→ escalation) → allow-list → conditions → Allowed
/// ```
///
/// The built-in table is immutable after construction. Custom rules are
/// appended through [`PolicyEngine::add_rule`] until [`PolicyEngine::freeze`].
pub struct PolicyEngine {
    /// Built-in rules
    builtin: Vec<Rule>,

    /// Index into `builtin` by (resource, operation)
    builtin_index: HashMap<(ResourceType, Operation), usize>,

    /// Runtime-added rules
    custom: RwLock<Vec<Rule>>,

    /// Set once the table stops accepting changes
    frozen: AtomicBool,

    /// Rule change audit trail
    changes: RuleChangeLog,

    /// Decision counters
    counters: DecisionCounters,

    /// Engine configuration
    config: EngineConfig,
}

impl PolicyEngine {
    /// Create an engine with the default rule table
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_rules(config, default_rules())
    }

    /// Create an engine with an explicit built-in table
    ///
    /// Fails if any rule is malformed or two rules govern the same pair.
    pub fn with_rules(config: EngineConfig, rules: Vec<Rule>) -> Result<Self> {
        let mut builtin_index = HashMap::with_capacity(rules.len());

        for (idx, rule) in rules.iter().enumerate() {
            rule.validate()?;
            if builtin_index.insert(rule.key(), idx).is_some() {
                return Err(AuthzError::RuleConflict(format!(
                    "Duplicate built-in rule for {}:{}",
                    rule.resource, rule.operation
                )));
            }
        }

        info!(
            "PolicyEngine initialized with {} built-in rules, {} escalation approvers",
            rules.len(),
            config.escalation_approvers.len()
        );

        Ok(Self {
            builtin: rules,
            builtin_index,
            custom: RwLock::new(Vec::new()),
            frozen: AtomicBool::new(false),
            changes: RuleChangeLog::new(),
            counters: DecisionCounters::new(),
            config,
        })
    }

    /// Decide whether `actor` may perform `operation` on `resource`
    ///
    /// A missing context is treated as empty.
    pub fn check_permission(
        &self,
        actor: &Actor,
        resource: ResourceType,
        operation: Operation,
        context: Option<&Context>,
    ) -> Decision {
        let decision = self.evaluate(actor, resource, operation, context);
        self.counters.record(&decision);

        debug!(
            actor = %actor.id,
            tier = %actor.tier,
            %resource,
            %operation,
            %decision,
            "Permission check"
        );

        decision
    }

    fn evaluate(
        &self,
        actor: &Actor,
        resource: ResourceType,
        operation: Operation,
        context: Option<&Context>,
    ) -> Decision {
        let key = (resource, operation);

        if let Some(&idx) = self.builtin_index.get(&key) {
            return self.evaluate_rule(&self.builtin[idx], actor, context);
        }

        let custom = self.custom.read();
        match custom.iter().find(|rule| rule.key() == key) {
            Some(rule) => self.evaluate_rule(rule, actor, context),
            None => Decision::Denied(DenialReason::NoRule),
        }
    }

    fn evaluate_rule(&self, rule: &Rule, actor: &Actor, context: Option<&Context>) -> Decision {
        if !rule.tiers.contains(&actor.tier) {
            // One rank short of the rule's lowest tier escalates instead of denying
            let escalates = matches!(
                (actor.tier.next_above(), rule.min_tier()),
                (Some(above), Some(min)) if above == min
            );
            return if escalates {
                Decision::PendingApproval {
                    approvers: self.config.escalation_approvers.clone(),
                }
            } else {
                Decision::Denied(DenialReason::TierNotAuthorized)
            };
        }

        if !rule.admits_actor(&actor.id) {
            return Decision::Denied(DenialReason::ActorNotAuthorized);
        }

        if !rule.conditions.is_empty() {
            let empty = Context::new();
            let context = context.unwrap_or(&empty);
            if let Some(failed) = rule.conditions.iter().find(|c| !c.evaluate(context)) {
                return Decision::Denied(DenialReason::ConditionNotMet {
                    key: failed.key.clone(),
                });
            }
        }

        Decision::Allowed
    }

    /// Operations `actor` may perform on `resource` with no context
    ///
    /// Conditional rules never qualify, since every condition fails on an
    /// empty context.
    pub fn get_allowed_operations(&self, actor: &Actor, resource: ResourceType) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.evaluate(actor, resource, *op, None).is_allowed())
            .collect()
    }

    /// Every resource type `actor` can perform at least one operation on
    pub fn get_accessible_resources(&self, actor: &Actor) -> BTreeMap<ResourceType, Vec<Operation>> {
        ResourceType::ALL
            .into_iter()
            .filter_map(|resource| {
                let ops = self.get_allowed_operations(actor, resource);
                (!ops.is_empty()).then_some((resource, ops))
            })
            .collect()
    }

    /// Static report over built-in and custom rules
    pub fn generate_permission_report(&self) -> PermissionReport {
        let custom = self.custom.read();
        PermissionReport::from_rules(self.builtin.iter().chain(custom.iter()))
    }

    /// Append a custom rule
    ///
    /// `admin` must be allowed `governance:update`. The rule must not
    /// collide with any existing rule.
    pub fn add_rule(&self, admin: &Actor, rule: Rule) -> Result<()> {
        if self.is_frozen() {
            warn!(admin = %admin.id, "Rejected rule change: table is frozen");
            return Err(AuthzError::RulesFrozen);
        }

        if !self
            .evaluate(admin, ResourceType::Governance, Operation::Update, None)
            .is_allowed()
        {
            warn!(admin = %admin.id, tier = %admin.tier, "Rejected rule change: not a governance admin");
            return Err(AuthzError::Unauthorized(format!(
                "{} may not update governance rules",
                admin.id
            )));
        }

        rule.validate()?;

        let key = rule.key();
        let mut custom = self.custom.write();

        // Re-check under the write lock so a concurrent freeze wins
        if self.is_frozen() {
            return Err(AuthzError::RulesFrozen);
        }

        if self.builtin_index.contains_key(&key) || custom.iter().any(|r| r.key() == key) {
            warn!(
                admin = %admin.id,
                resource = %rule.resource,
                operation = %rule.operation,
                "Rejected rule change: pair already governed"
            );
            return Err(AuthzError::RuleConflict(format!(
                "A rule for {}:{} already exists",
                rule.resource, rule.operation
            )));
        }

        self.changes.record(&admin.id, &rule);
        custom.push(rule);
        Ok(())
    }

    /// Stop accepting rule changes
    pub fn freeze(&self) {
        let _guard = self.custom.write();
        if !self.frozen.swap(true, Ordering::SeqCst) {
            info!("Rule table frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Built-in rules followed by custom rules
    pub fn rules(&self) -> Vec<Rule> {
        let custom = self.custom.read();
        self.builtin.iter().chain(custom.iter()).cloned().collect()
    }

    /// Accepted rule changes, oldest first
    pub fn rule_changes(&self) -> Vec<RuleChange> {
        self.changes.entries()
    }

    /// Decision counters
    pub fn stats(&self) -> DecisionStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
