//! Access grant tests
//!
//! Expiry is driven by a manual clock, never by sleeping.

use chrono::Duration;
use std::sync::Arc;
use warden_authz::{
    AccessGrantStore, AuthzError, GrantKey, GrantResourceType, GrantStore, InMemoryGrantStore,
    Permission,
};
use warden_core::{Clock, ManualClock};

fn fixture() -> (AccessGrantStore, Arc<InMemoryGrantStore>, ManualClock) {
    let store = Arc::new(InMemoryGrantStore::new());
    let clock = ManualClock::starting_now();
    let grants = AccessGrantStore::new(store.clone(), Arc::new(clock.clone()));
    (grants, store, clock)
}

// ============================================================================
// GRANT LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_grant_then_expire() {
    let (grants, _, clock) = fixture();

    assert!(
        grants
            .grant_access(
                "agentA",
                GrantResourceType::Archive,
                "arc123",
                [Permission::Read],
                "admin1",
                Some(1),
            )
            .await
    );

    assert!(
        grants
            .check_access("agentA", GrantResourceType::Archive, "arc123", Permission::Read)
            .await
    );

    clock.advance(Duration::days(2));

    assert!(
        !grants
            .check_access("agentA", GrantResourceType::Archive, "arc123", Permission::Read)
            .await
    );
}

#[tokio::test]
async fn test_expiry_is_exact_to_the_second() {
    let (grants, _, clock) = fixture();
    grants
        .try_grant_access(
            "agentA",
            GrantResourceType::AgentData,
            "phoenix",
            [Permission::Read],
            "admin1",
            Some(3),
        )
        .await
        .unwrap();

    clock.advance(Duration::days(3) - Duration::seconds(1));
    assert!(
        grants
            .check_access("agentA", GrantResourceType::AgentData, "phoenix", Permission::Read)
            .await
    );

    clock.advance(Duration::seconds(2));
    assert!(
        !grants
            .check_access("agentA", GrantResourceType::AgentData, "phoenix", Permission::Read)
            .await
    );
}

#[tokio::test]
async fn test_grant_without_expiry_never_expires() {
    let (grants, _, clock) = fixture();
    let grant = grants
        .try_grant_access(
            "agentA",
            GrantResourceType::SystemLogs,
            "syslog",
            [Permission::Read, Permission::Share],
            "admin1",
            None,
        )
        .await
        .unwrap();
    assert!(grant.expires_at.is_none());

    clock.advance(Duration::days(10_000));
    assert!(
        grants
            .check_access("agentA", GrantResourceType::SystemLogs, "syslog", Permission::Share)
            .await
    );
}

#[tokio::test]
async fn test_grant_records_issuer_and_times() {
    let (grants, _, clock) = fixture();
    let grant = grants
        .try_grant_access(
            "agentA",
            GrantResourceType::Archive,
            "arc1",
            [Permission::Write],
            "admin1",
            Some(7),
        )
        .await
        .unwrap();

    assert_eq!(grant.granted_by, "admin1");
    assert_eq!(grant.granted_at, clock.now());
    assert_eq!(grant.expires_at, Some(clock.now() + Duration::days(7)));
}

// ============================================================================
// CHECK SEMANTICS
// ============================================================================

#[tokio::test]
async fn test_exact_key_and_permission() {
    let (grants, _, _) = fixture();
    grants
        .try_grant_access(
            "agentA",
            GrantResourceType::Archive,
            "arc1",
            [Permission::Read],
            "admin1",
            None,
        )
        .await
        .unwrap();

    assert!(
        !grants
            .check_access("agentA", GrantResourceType::Archive, "arc1", Permission::Delete)
            .await
    );
    assert!(
        !grants
            .check_access("agentA", GrantResourceType::Archive, "arc2", Permission::Read)
            .await
    );
    assert!(
        !grants
            .check_access("agentB", GrantResourceType::Archive, "arc1", Permission::Read)
            .await
    );
    assert!(
        !grants
            .check_access("agentA", GrantResourceType::AgentData, "arc1", Permission::Read)
            .await
    );
}

// ============================================================================
// CONFLICTS AND VALIDATION
// ============================================================================

#[tokio::test]
async fn test_active_grant_blocks_new_grant() {
    let (grants, store, _) = fixture();
    assert!(
        grants
            .grant_access("agentA", GrantResourceType::Archive, "arc1", [Permission::Read], "admin1", Some(5))
            .await
    );
    assert!(
        !grants
            .grant_access("agentA", GrantResourceType::Archive, "arc1", [Permission::Delete], "admin2", Some(5))
            .await
    );

    let key = GrantKey::new("agentA", GrantResourceType::Archive, "arc1");
    let stored = store.find(&key).await.unwrap().unwrap();
    assert_eq!(stored.granted_by, "admin1");
}

#[tokio::test]
async fn test_inert_grant_is_replaced() {
    let (grants, store, clock) = fixture();
    grants
        .try_grant_access("agentA", GrantResourceType::Archive, "arc1", [Permission::Read], "admin1", Some(1))
        .await
        .unwrap();

    clock.advance(Duration::days(2));

    grants
        .try_grant_access("agentA", GrantResourceType::Archive, "arc1", [Permission::Delete], "admin2", Some(1))
        .await
        .unwrap();

    assert_eq!(store.len().await, 1);
    assert!(
        grants
            .check_access("agentA", GrantResourceType::Archive, "arc1", Permission::Delete)
            .await
    );
}

#[tokio::test]
async fn test_empty_permissions_rejected() {
    let (grants, store, _) = fixture();
    let result = grants
        .try_grant_access("agentA", GrantResourceType::Archive, "arc1", Vec::<Permission>::new(), "admin1", None)
        .await;
    assert!(matches!(result, Err(AuthzError::InvalidGrant(_))));
    assert!(store.is_empty().await);
}

// ============================================================================
// PURGE
// ============================================================================

#[tokio::test]
async fn test_purge_removes_only_inert() {
    let (grants, store, clock) = fixture();
    grants
        .try_grant_access("a", GrantResourceType::Archive, "short", [Permission::Read], "root", Some(1))
        .await
        .unwrap();
    grants
        .try_grant_access("a", GrantResourceType::Archive, "long", [Permission::Read], "root", Some(30))
        .await
        .unwrap();
    grants
        .try_grant_access("a", GrantResourceType::Archive, "forever", [Permission::Read], "root", None)
        .await
        .unwrap();

    clock.advance(Duration::days(2));

    assert_eq!(grants.purge_expired().await.unwrap(), 1);
    assert_eq!(grants.purge_expired().await.unwrap(), 0);
    assert_eq!(store.len().await, 2);
}
