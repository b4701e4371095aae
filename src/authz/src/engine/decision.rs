//! Authorization decision types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_core::ActorId;

/// Why a check was denied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// No rule governs the resource/operation pair
    NoRule,

    /// Actor's tier is not allowed and escalation does not apply
    TierNotAuthorized,

    /// Rule's allow-list excludes the actor
    ActorNotAuthorized,

    /// A rule condition evaluated false
    ConditionNotMet { key: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NoRule => f.write_str("no_rule"),
            DenialReason::TierNotAuthorized => f.write_str("tier_not_authorized"),
            DenialReason::ActorNotAuthorized => f.write_str("actor_not_authorized"),
            DenialReason::ConditionNotMet { key } => write!(f, "condition:{} not met", key),
        }
    }
}

impl FromStr for DenialReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_rule" => Ok(DenialReason::NoRule),
            "tier_not_authorized" => Ok(DenialReason::TierNotAuthorized),
            "actor_not_authorized" => Ok(DenialReason::ActorNotAuthorized),
            other => other
                .strip_prefix("condition:")
                .and_then(|rest| rest.strip_suffix(" not met"))
                .map(|key| DenialReason::ConditionNotMet {
                    key: key.to_string(),
                })
                .ok_or_else(|| format!("Unknown denial reason: {}", other)),
        }
    }
}

/// Outcome of a permission check
///
/// An allowed decision never requires approval, and a pending decision is
/// never allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DecisionRecord", try_from = "DecisionRecord")]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
    PendingApproval { approvers: Vec<ActorId> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn requires_approval(&self) -> bool {
        matches!(self, Decision::PendingApproval { .. })
    }

    /// Denial reason, if denied
    pub fn reason(&self) -> Option<&DenialReason> {
        match self {
            Decision::Denied(reason) => Some(reason),
            _ => None,
        }
    }

    /// Approvers to route to, if pending approval
    pub fn approvers(&self) -> Option<&[ActorId]> {
        match self {
            Decision::PendingApproval { approvers } => Some(approvers),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allowed => f.write_str("allowed"),
            Decision::Denied(reason) => write!(f, "denied ({})", reason),
            Decision::PendingApproval { approvers } => {
                write!(f, "pending approval by [{}]", approvers.join(", "))
            }
        }
    }
}

/// Flat wire form of a [`Decision`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionRecord {
    allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requires_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    approvers: Option<Vec<ActorId>>,
}

impl From<Decision> for DecisionRecord {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allowed => DecisionRecord {
                allowed: true,
                reason: None,
                requires_approval: None,
                approvers: None,
            },
            Decision::Denied(reason) => DecisionRecord {
                allowed: false,
                reason: Some(reason.to_string()),
                requires_approval: None,
                approvers: None,
            },
            Decision::PendingApproval { approvers } => DecisionRecord {
                allowed: false,
                reason: None,
                requires_approval: Some(true),
                approvers: Some(approvers),
            },
        }
    }
}

impl TryFrom<DecisionRecord> for Decision {
    type Error = String;

    fn try_from(record: DecisionRecord) -> Result<Self, Self::Error> {
        match record {
            DecisionRecord {
                allowed: true,
                requires_approval: None | Some(false),
                ..
            } => Ok(Decision::Allowed),
            DecisionRecord {
                allowed: true,
                requires_approval: Some(true),
                ..
            } => Err("Decision cannot be both allowed and pending approval".to_string()),
            DecisionRecord {
                requires_approval: Some(true),
                approvers,
                ..
            } => Ok(Decision::PendingApproval {
                approvers: approvers.unwrap_or_default(),
            }),
            DecisionRecord { reason, .. } => {
                let reason = reason.ok_or_else(|| "Denied decision without a reason".to_string())?;
                Ok(Decision::Denied(reason.parse()?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reason_strings() {
        assert_eq!(DenialReason::NoRule.to_string(), "no_rule");
        assert_eq!(
            DenialReason::ConditionNotMet {
                key: "hour".to_string()
            }
            .to_string(),
            "condition:hour not met"
        );
        assert_eq!(
            "condition:owner not met".parse::<DenialReason>().unwrap(),
            DenialReason::ConditionNotMet {
                key: "owner".to_string()
            }
        );
        assert!("nonsense".parse::<DenialReason>().is_err());
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(
            serde_json::to_value(Decision::Allowed).unwrap(),
            json!({"allowed": true})
        );
        assert_eq!(
            serde_json::to_value(Decision::Denied(DenialReason::NoRule)).unwrap(),
            json!({"allowed": false, "reason": "no_rule"})
        );
        assert_eq!(
            serde_json::to_value(Decision::PendingApproval {
                approvers: vec!["mrf".to_string()]
            })
            .unwrap(),
            json!({"allowed": false, "requires_approval": true, "approvers": ["mrf"]})
        );
    }

    #[test]
    fn test_wire_form_parses_back() {
        let decision: Decision =
            serde_json::from_value(json!({"allowed": false, "reason": "actor_not_authorized"}))
                .unwrap();
        assert_eq!(decision, Decision::Denied(DenialReason::ActorNotAuthorized));

        let invalid = serde_json::from_value::<Decision>(
            json!({"allowed": true, "requires_approval": true}),
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn test_accessors() {
        let pending = Decision::PendingApproval {
            approvers: vec!["oracle".to_string()],
        };
        assert!(!pending.is_allowed());
        assert!(pending.requires_approval());
        assert_eq!(pending.approvers(), Some(&["oracle".to_string()][..]));
        assert!(pending.reason().is_none());

        assert!(Decision::Allowed.is_allowed());
        assert!(!Decision::Allowed.requires_approval());
    }
}
