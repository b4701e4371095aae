//! Policy engine tests
//!
//! Rule lookup → tier check / escalation → allow-list → conditions

use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use warden_authz::{
    Actor, AuthzError, Condition, ConditionOperator, Context, Decision, DenialReason,
    EngineConfig, Operation, PolicyEngine, ResourceType, Rule, Tier,
};

fn engine() -> PolicyEngine {
    PolicyEngine::new(EngineConfig::default()).unwrap()
}

fn executive() -> Actor {
    Actor::new("mrf", Tier::Executive)
}

fn administrative(id: &str) -> Actor {
    Actor::new(id, Tier::Administrative)
}

fn productive(id: &str) -> Actor {
    Actor::new(id, Tier::Productive)
}

// ============================================================================
// BASIC DECISION FLOW
// ============================================================================

#[test]
fn test_allowed_tier() {
    let engine = engine();
    let decision = engine.check_permission(
        &productive("scout"),
        ResourceType::Tasks,
        Operation::Read,
        None,
    );
    assert_eq!(decision, Decision::Allowed);
}

#[test]
fn test_no_rule() {
    let engine = engine();
    let decision = engine.check_permission(&executive(), ResourceType::Users, Operation::Share, None);
    assert_eq!(decision, Decision::Denied(DenialReason::NoRule));

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["allowed"], false);
    assert_eq!(json["reason"], "no_rule");
}

#[test]
fn test_tier_two_ranks_below_is_denied() {
    let engine = engine();
    let decision = engine.check_permission(
        &productive("scout"),
        ResourceType::SystemConfig,
        Operation::Update,
        None,
    );
    assert_eq!(decision, Decision::Denied(DenialReason::TierNotAuthorized));
}

#[test]
fn test_higher_tier_not_in_rule_is_denied() {
    // tasks:execute is productive-only
    let engine = engine();
    let decision = engine.check_permission(&executive(), ResourceType::Tasks, Operation::Execute, None);
    assert_eq!(decision, Decision::Denied(DenialReason::TierNotAuthorized));
}

// ============================================================================
// ESCALATION
// ============================================================================

#[test]
fn test_administrative_on_executive_only_escalates() {
    let engine = engine();
    let decision = engine.check_permission(
        &administrative("sentinel"),
        ResourceType::Archives,
        Operation::Delete,
        None,
    );

    assert!(!decision.is_allowed());
    assert!(decision.requires_approval());
    assert_eq!(
        decision.approvers().unwrap(),
        &["mrf".to_string(), "genius".to_string(), "oracle".to_string()]
    );

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["allowed"], false);
    assert_eq!(json["requires_approval"], true);
    assert_eq!(json["approvers"].as_array().unwrap().len(), 3);
}

#[test]
fn test_escalation_on_custom_table() {
    let rules = vec![Rule::new(
        ResourceType::Archives,
        Operation::Delete,
        &[Tier::Executive],
    )];
    let engine = PolicyEngine::with_rules(EngineConfig::default(), rules).unwrap();

    let decision = engine.check_permission(
        &administrative("sentinel"),
        ResourceType::Archives,
        Operation::Delete,
        None,
    );
    assert!(decision.requires_approval());
    assert!(!decision.approvers().unwrap().is_empty());
}

#[test]
fn test_productive_escalates_when_min_tier_is_administrative() {
    let engine = engine();
    let decision = engine.check_permission(
        &productive("scout"),
        ResourceType::Archives,
        Operation::Create,
        None,
    );
    assert!(decision.requires_approval());
}

#[test]
fn test_configured_approvers() {
    let config = EngineConfig {
        escalation_approvers: vec!["council".to_string()],
    };
    let engine = PolicyEngine::new(config).unwrap();
    let decision = engine.check_permission(
        &administrative("sentinel"),
        ResourceType::Users,
        Operation::Delete,
        None,
    );
    assert_eq!(
        decision,
        Decision::PendingApproval {
            approvers: vec!["council".to_string()]
        }
    );
}

// ============================================================================
// ALLOW-LISTS
// ============================================================================

#[test]
fn test_allow_list() {
    let engine = engine();

    let allowed = engine.check_permission(
        &administrative("sentinel"),
        ResourceType::AuditLogs,
        Operation::Read,
        None,
    );
    assert!(allowed.is_allowed());

    let excluded = engine.check_permission(
        &administrative("scribe"),
        ResourceType::AuditLogs,
        Operation::Read,
        None,
    );
    assert_eq!(excluded, Decision::Denied(DenialReason::ActorNotAuthorized));
}

#[test]
fn test_tier_check_runs_before_allow_list() {
    // devopsbot is on the allow-list but administrative: escalation wins
    let engine = engine();
    let decision = engine.check_permission(
        &administrative("devopsbot"),
        ResourceType::Deployments,
        Operation::Execute,
        None,
    );
    assert!(decision.requires_approval());

    let listed = engine.check_permission(
        &Actor::new("devopsbot", Tier::Executive),
        ResourceType::Deployments,
        Operation::Execute,
        None,
    );
    assert!(listed.is_allowed());

    let unlisted = engine.check_permission(&executive(), ResourceType::Deployments, Operation::Execute, None);
    assert_eq!(unlisted, Decision::Denied(DenialReason::ActorNotAuthorized));
}

// ============================================================================
// CONDITIONS
// ============================================================================

fn conditional_engine() -> PolicyEngine {
    let rules = vec![Rule::new(ResourceType::Reports, Operation::Read, &Tier::ALL)
        .with_condition(Condition::new("hour", ConditionOperator::Between, json!([9, 17])))
        .with_condition(Condition::new(
            "region",
            ConditionOperator::In,
            json!(["eu", "us"]),
        ))];
    PolicyEngine::with_rules(EngineConfig::default(), rules).unwrap()
}

#[test]
fn test_conditions_hold() {
    let engine = conditional_engine();
    let context = Context::from([
        ("hour".to_string(), json!(10)),
        ("region".to_string(), json!("eu")),
    ]);
    let decision = engine.check_permission(
        &productive("scout"),
        ResourceType::Reports,
        Operation::Read,
        Some(&context),
    );
    assert!(decision.is_allowed());
}

#[test]
fn test_first_failing_condition_is_reported() {
    let engine = conditional_engine();
    let context = Context::from([
        ("hour".to_string(), json!(22)),
        ("region".to_string(), json!("apac")),
    ]);
    let decision = engine.check_permission(
        &productive("scout"),
        ResourceType::Reports,
        Operation::Read,
        Some(&context),
    );
    assert_eq!(
        decision,
        Decision::Denied(DenialReason::ConditionNotMet {
            key: "hour".to_string()
        })
    );
    assert_eq!(
        serde_json::to_value(&decision).unwrap()["reason"],
        "condition:hour not met"
    );
}

#[test]
fn test_missing_context_fails_conditions() {
    let engine = conditional_engine();
    let decision = engine.check_permission(&productive("scout"), ResourceType::Reports, Operation::Read, None);
    assert!(!decision.is_allowed());
    assert!(matches!(decision, Decision::Denied(DenialReason::ConditionNotMet { .. })));
}

#[test]
fn test_conditional_rules_not_listed_without_context() {
    let engine = conditional_engine();
    let actor = productive("scout");

    assert!(engine.get_allowed_operations(&actor, ResourceType::Reports).is_empty());
    assert!(engine.get_accessible_resources(&actor).is_empty());
}

// ============================================================================
// QUERIES AND REPORT
// ============================================================================

#[test]
fn test_allowed_operations() {
    let engine = engine();
    let ops = engine.get_allowed_operations(&productive("scout"), ResourceType::Tasks);
    assert_eq!(ops, vec![Operation::Read, Operation::Update, Operation::Execute]);

    let none = engine.get_allowed_operations(&productive("scout"), ResourceType::SystemConfig);
    assert!(none.is_empty());
}

#[test]
fn test_accessible_resources_only_non_empty() {
    let engine = engine();
    let resources = engine.get_accessible_resources(&productive("scout"));

    assert!(resources.contains_key(&ResourceType::Agents));
    assert!(!resources.contains_key(&ResourceType::SystemConfig));
    assert!(!resources.contains_key(&ResourceType::Users));
    assert!(resources.values().all(|ops| !ops.is_empty()));
}

#[test]
fn test_permission_report() {
    let engine = engine();
    let report = engine.generate_permission_report();

    let exec = &report.by_tier[&Tier::Executive];
    let prod = &report.by_tier[&Tier::Productive];
    assert!(exec.operations > prod.operations);
    assert_eq!(exec.resources, ResourceType::ALL.len());

    let tasks = &report.by_resource[&ResourceType::Tasks];
    assert!(tasks.operations.contains(&Operation::Approve));
    assert_eq!(tasks.tiers.len(), 3);
}

// ============================================================================
// RULE ADMINISTRATION
// ============================================================================

#[test]
fn test_add_rule_by_admin() {
    let engine = engine();
    let rule = Rule::new(ResourceType::Tasks, Operation::Share, &[Tier::Administrative]);

    engine.add_rule(&executive(), rule.clone()).unwrap();

    let decision = engine.check_permission(
        &administrative("sentinel"),
        ResourceType::Tasks,
        Operation::Share,
        None,
    );
    assert!(decision.is_allowed());

    let changes = engine.rule_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].admin, "mrf");
    assert_eq!(changes[0].rule, rule);

    let report = engine.generate_permission_report();
    assert!(report.by_resource[&ResourceType::Tasks]
        .operations
        .contains(&Operation::Share));
}

#[test]
fn test_add_rule_requires_governance_update() {
    let engine = engine();
    let rule = Rule::new(ResourceType::Tasks, Operation::Share, &[Tier::Productive]);

    let result = engine.add_rule(&administrative("sentinel"), rule);
    assert!(matches!(result, Err(AuthzError::Unauthorized(_))));
    assert!(engine.rule_changes().is_empty());
}

#[test]
fn test_add_rule_cannot_shadow() {
    let engine = engine();

    let shadow = Rule::new(ResourceType::Archives, Operation::Delete, &[Tier::Productive]);
    assert!(matches!(
        engine.add_rule(&executive(), shadow),
        Err(AuthzError::RuleConflict(_))
    ));

    let first = Rule::new(ResourceType::Tasks, Operation::Share, &[Tier::Executive]);
    engine.add_rule(&executive(), first).unwrap();
    let second = Rule::new(ResourceType::Tasks, Operation::Share, &[Tier::Productive]);
    assert!(matches!(
        engine.add_rule(&executive(), second),
        Err(AuthzError::RuleConflict(_))
    ));

    let decision = engine.check_permission(&productive("scout"), ResourceType::Tasks, Operation::Share, None);
    assert!(!decision.is_allowed());
}

#[test]
fn test_add_rule_rejects_empty_tiers() {
    let engine = engine();
    let rule = Rule::new(ResourceType::Tasks, Operation::Share, &[]);
    assert!(matches!(
        engine.add_rule(&executive(), rule),
        Err(AuthzError::InvalidRule(_))
    ));
}

#[test]
fn test_freeze_rejects_changes() {
    let engine = engine();
    engine.freeze();

    let rule = Rule::new(ResourceType::Tasks, Operation::Share, &[Tier::Executive]);
    assert!(matches!(
        engine.add_rule(&executive(), rule),
        Err(AuthzError::RulesFrozen)
    ));
    assert_eq!(engine.rules().len(), warden_authz::default_rules().len());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_checks() {
    let engine = Arc::new(engine());
    let mut handles = Vec::new();

    for i in 0..16 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let actor = productive(&format!("agent-{}", i));
            for _ in 0..100 {
                assert!(engine
                    .check_permission(&actor, ResourceType::Agents, Operation::Read, None)
                    .is_allowed());
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let stats = engine.stats();
    assert_eq!(stats.total_checks, 1600);
    assert_eq!(stats.allowed, 1600);
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop::sample::select(Tier::ALL.to_vec())
}

fn resource_strategy() -> impl Strategy<Value = ResourceType> {
    prop::sample::select(ResourceType::ALL.to_vec())
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop::sample::select(Operation::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_never_allowed_and_pending(
        tier in tier_strategy(),
        resource in resource_strategy(),
        operation in operation_strategy(),
    ) {
        let engine = engine();
        let actor = Actor::new("sentinel", tier);
        let decision = engine.check_permission(&actor, resource, operation, None);
        prop_assert!(!(decision.is_allowed() && decision.requires_approval()));

        let json = serde_json::to_value(&decision).unwrap();
        prop_assert_eq!(json["allowed"].as_bool(), Some(decision.is_allowed()));
    }

    #[test]
    fn prop_unknown_pairs_are_no_rule(
        tier in tier_strategy(),
        resource in resource_strategy(),
        operation in operation_strategy(),
    ) {
        let engine = engine();
        let governed: HashSet<_> = engine.rules().iter().map(Rule::key).collect();
        let decision = engine.check_permission(&Actor::new("x", tier), resource, operation, None);
        if !governed.contains(&(resource, operation)) {
            prop_assert_eq!(decision, Decision::Denied(DenialReason::NoRule));
        }
    }
}
