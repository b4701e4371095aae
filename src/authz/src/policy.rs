//! Rule and condition definitions

use crate::error::{AuthzError, Result};
use crate::types::{Context, Operation, ResourceType, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use warden_core::ActorId;

/// Condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    In,
    Between,
}

/// Predicate over one context key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Context key the condition reads
    pub key: String,

    /// Comparison operator
    pub operator: ConditionOperator,

    /// Operand (array for `in`, `[low, high]` for `between`)
    pub value: Value,
}

impl Condition {
    pub fn new(key: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            key: key.into(),
            operator,
            value,
        }
    }

    /// Evaluate against `context`. A missing key fails every operator.
    pub fn evaluate(&self, context: &Context) -> bool {
        let Some(actual) = context.get(&self.key) else {
            return false;
        };

        match self.operator {
            ConditionOperator::Eq => actual == &self.value,
            ConditionOperator::Ne => actual != &self.value,
            ConditionOperator::Gt => numeric_cmp(actual, &self.value) == Some(Ordering::Greater),
            ConditionOperator::Lt => numeric_cmp(actual, &self.value) == Some(Ordering::Less),
            ConditionOperator::In => self
                .value
                .as_array()
                .map_or(false, |candidates| candidates.contains(actual)),
            ConditionOperator::Between => match self.value.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    matches!(
                        numeric_cmp(actual, low),
                        Some(Ordering::Greater | Ordering::Equal)
                    ) && matches!(
                        numeric_cmp(actual, high),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                }
                _ => false,
            },
        }
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

/// Static permission rule for one `(resource, operation)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Resource type the rule governs
    pub resource: ResourceType,

    /// Operation the rule governs
    pub operation: Operation,

    /// Tiers allowed to perform the operation
    pub tiers: BTreeSet<Tier>,

    /// Optional actor allow-list; empty means unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<BTreeSet<ActorId>>,

    /// Conditions evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Create a rule allowing `tiers`
    pub fn new(resource: ResourceType, operation: Operation, tiers: &[Tier]) -> Self {
        Self {
            resource,
            operation,
            tiers: tiers.iter().copied().collect(),
            actors: None,
            conditions: Vec::new(),
        }
    }

    /// Restrict the rule to specific actors
    pub fn with_actors<I, S>(mut self, actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ActorId>,
    {
        self.actors = Some(actors.into_iter().map(Into::into).collect());
        self
    }

    /// Append a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// The `(resource, operation)` pair this rule governs
    pub fn key(&self) -> (ResourceType, Operation) {
        (self.resource, self.operation)
    }

    /// Lowest allowed tier
    pub fn min_tier(&self) -> Option<Tier> {
        self.tiers.iter().next().copied()
    }

    /// Whether the allow-list (if any) admits `actor_id`
    pub fn admits_actor(&self, actor_id: &str) -> bool {
        match &self.actors {
            Some(actors) if !actors.is_empty() => actors.contains(actor_id),
            _ => true,
        }
    }

    /// Reject rules that could never allow anything
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(AuthzError::InvalidRule(format!(
                "{}:{} has no allowed tiers",
                self.resource, self.operation
            )));
        }
        if let Some(condition) = self.conditions.iter().find(|c| c.key.is_empty()) {
            return Err(AuthzError::InvalidRule(format!(
                "{}:{} has a {:?} condition without a key",
                self.resource, self.operation, condition.operator
            )));
        }
        Ok(())
    }
}
