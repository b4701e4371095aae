//! Decision counters

use super::decision::Decision;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionStats {
    /// Total permission checks
    pub total_checks: u64,

    /// Allowed decisions
    pub allowed: u64,

    /// Denied decisions
    pub denied: u64,

    /// Decisions escalated to pending approval
    pub escalated: u64,
}

impl DecisionStats {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.allowed as f64 / self.total_checks as f64
        }
    }
}

/// Lock-free decision counters
#[derive(Debug, Default)]
pub struct DecisionCounters {
    total_checks: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    escalated: AtomicU64,
}

impl DecisionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluated decision
    pub fn record(&self, decision: &Decision) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            Decision::Allowed => &self.allowed,
            Decision::Denied(_) => &self.denied,
            Decision::PendingApproval { .. } => &self.escalated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current counters
    pub fn snapshot(&self) -> DecisionStats {
        DecisionStats {
            total_checks: self.total_checks.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            escalated: self.escalated.load(Ordering::Relaxed),
        }
    }
}
