//! Policy-or-grant composition for resource-scoped checks

use crate::engine::{Decision, PolicyEngine};
use crate::grants::{AccessGrantStore, GrantResourceType, Permission};
use crate::types::{Actor, Context, Operation, ResourceType};
use std::sync::Arc;
use tracing::debug;

/// Which authority allowed a resource-scoped request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The rule table allowed it
    Policy,

    /// A grant on the specific resource allowed it
    Grant,

    /// Neither allowed it; carries the policy decision
    Denied(Decision),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Policy | Authorization::Grant)
    }

    /// Policy decision behind a denial
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Authorization::Denied(decision) => Some(decision),
            _ => None,
        }
    }
}

/// Composes [`PolicyEngine`] with [`AccessGrantStore`]
///
/// A request on a specific resource instance is allowed if the policy allows
/// it, or failing that, if a live grant covers it.
pub struct Authorizer {
    engine: Arc<PolicyEngine>,
    grants: Arc<AccessGrantStore>,
}

impl Authorizer {
    pub fn new(engine: Arc<PolicyEngine>, grants: Arc<AccessGrantStore>) -> Self {
        Self { engine, grants }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn grants(&self) -> &AccessGrantStore {
        &self.grants
    }

    /// Authorize `operation` on one instance of `resource`
    pub async fn authorize(
        &self,
        actor: &Actor,
        resource: ResourceType,
        resource_id: &str,
        operation: Operation,
        context: Option<&Context>,
    ) -> Authorization {
        let decision = self
            .engine
            .check_permission(actor, resource, operation, context);
        if decision.is_allowed() {
            return Authorization::Policy;
        }

        let grantable = GrantResourceType::for_resource(resource)
            .zip(Permission::for_operation(operation));

        if let Some((grant_type, permission)) = grantable {
            if self
                .grants
                .check_access(&actor.id, grant_type, resource_id, permission)
                .await
            {
                debug!(
                    actor = %actor.id,
                    %resource,
                    resource_id,
                    %operation,
                    "Allowed by grant"
                );
                return Authorization::Grant;
            }
        }

        Authorization::Denied(decision)
    }
}
