//! Permission report over the rule table

use crate::policy::Rule;
use crate::types::{Operation, ResourceType, Tier};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// What a single tier can reach
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    /// Distinct resource types with at least one rule including the tier
    pub resources: usize,

    /// Rule (resource, operation) pairs including the tier
    pub operations: usize,
}

/// Who can do what on a single resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub tiers: BTreeSet<Tier>,
    pub operations: BTreeSet<Operation>,
}

/// Static view of the rule table; grants are not included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionReport {
    pub by_tier: BTreeMap<Tier, TierSummary>,
    pub by_resource: BTreeMap<ResourceType, ResourceSummary>,
}

impl PermissionReport {
    /// Build a report from the given rules
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> Self {
        let mut tier_resources: BTreeMap<Tier, BTreeSet<ResourceType>> = BTreeMap::new();
        let mut report = PermissionReport::default();

        for tier in Tier::ALL {
            report.by_tier.insert(tier, TierSummary::default());
            tier_resources.insert(tier, BTreeSet::new());
        }

        for rule in rules {
            for tier in &rule.tiers {
                tier_resources.entry(*tier).or_default().insert(rule.resource);
                report.by_tier.entry(*tier).or_default().operations += 1;
            }

            let summary = report.by_resource.entry(rule.resource).or_default();
            summary.tiers.extend(rule.tiers.iter().copied());
            summary.operations.insert(rule.operation);
        }

        for (tier, resources) in tier_resources {
            report.by_tier.entry(tier).or_default().resources = resources.len();
        }

        report
    }
}
